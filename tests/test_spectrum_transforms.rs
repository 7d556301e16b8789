//! Loading transforms applied together: labels, projection and polarization
//! driven by the holder.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use ndarray::IxDyn;

use demograph::data::{read_sfs, SfsDataHolder};

fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

fn write_spectrum(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_projection_preserves_total() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_spectrum(&dir, "one_pop.fs", "7 unfolded \"YRI\"\n0 6 5 4 3 2 0\n");

    let full = read_sfs(&SfsDataHolder::new(&path)).unwrap();
    let holder = SfsDataHolder::new(&path).with_projections(vec![4]);
    let projected = read_sfs(&holder).unwrap();

    assert_eq!(projected.sample_sizes(), vec![4]);
    // down-sampling redistributes mass without losing polymorphic sites,
    // up to what lands in the corners
    let projected_mass: f64 = projected.data.iter().sum();
    let full_mass: f64 = full.data.iter().sum();
    assert!(approx_eq(projected_mass, full_mass, 1e-9));
}

#[test]
fn test_projection_to_larger_size_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_spectrum(&dir, "one_pop.fs", "5 unfolded\n0 1 2 3 0\n");
    let holder = SfsDataHolder::new(path).with_projections(vec![10]);
    assert!(read_sfs(&holder).is_err());
}

#[test]
fn test_reorder_then_fold() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_spectrum(
        &dir,
        "two_pop.fs",
        "3 3 unfolded \"YRI\" \"CEU\"\n0 1 2 3 4 5 6 7 0\n",
    );
    let holder = SfsDataHolder::new(path)
        .with_labels(vec!["CEU".to_string(), "YRI".to_string()])
        .with_outgroup(false);
    let sfs = read_sfs(&holder).unwrap();

    assert_eq!(sfs.pop_ids, vec!["CEU", "YRI"]);
    assert!(sfs.folded);
    // cell (0, 1) after the axis swap is the original (1, 0) = 3, and its
    // mirror (2, 1) = 5 folds onto it
    assert!(approx_eq(sfs.data[IxDyn(&[0, 1])], 8.0, 1e-12));
    // entries above the fold are zeroed
    assert!(approx_eq(sfs.data[IxDyn(&[2, 1])], 0.0, 1e-12));
}

#[test]
fn test_fold_is_idempotent_on_folded_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_spectrum(&dir, "folded.fs", "5 folded \"YRI\"\n0 5 3 0 0\n");
    let holder = SfsDataHolder::new(path).with_outgroup(false);
    let sfs = read_sfs(&holder).unwrap();
    assert!(sfs.folded);
    assert!(approx_eq(sfs.data[IxDyn(&[1])], 5.0, 1e-12));
}
