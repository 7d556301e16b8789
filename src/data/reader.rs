//! Loading observed spectra from the two supported on-disk formats.
//!
//! The file extension selects the parser: `.fs`/`.sfs` is the dense
//! serialized-array format, `.txt` the SNP genotype table. Any other
//! extension gets a best-effort attempt at both before failing with a
//! format-detection error naming the attempts.

use std::fs;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use statrs::function::factorial::ln_binomial;

use crate::data::{SfsDataHolder, Spectrum};
use crate::errors::DataError;

/// Read and transform the spectrum described by `holder`.
pub fn read_sfs(holder: &SfsDataHolder) -> Result<Spectrum, DataError> {
    let extension = holder
        .filename
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match extension {
        "fs" | "sfs" => read_dense(holder),
        "txt" => read_snp(holder),
        _ => match read_dense(holder) {
            Ok(sfs) => Ok(sfs),
            Err(dense) => match read_snp(holder) {
                Ok(sfs) => Ok(sfs),
                Err(snp) => Err(DataError::UnknownFormat {
                    dense: dense.to_string(),
                    snp: snp.to_string(),
                }),
            },
        },
    }
}

/// Dense-format pipeline: parse, label, reorder, project, repolarize. Each
/// stage no-ops when its holder parameter is absent.
fn read_dense(holder: &SfsDataHolder) -> Result<Spectrum, DataError> {
    let mut sfs = parse_dense_file(&holder.filename)?.with_default_labels();
    if let Some(labels) = &holder.population_labels {
        sfs = sfs.reorder_labels(labels)?;
    }
    if let Some(projections) = &holder.projections {
        sfs = sfs.project(projections)?;
    }
    sfs.change_outgroup(holder.outgroup)
}

/// Parse the dense spectrum serialization: comment lines, a shape line with
/// a `folded`/`unfolded` marker and optional quoted population labels, one
/// line of cell values, and an optional mask line (accepted and ignored;
/// the monomorphic corners are always excluded downstream).
fn parse_dense_file(path: &Path) -> Result<Spectrum, DataError> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines
        .next()
        .ok_or_else(|| DataError::Parse("file is empty".to_string()))?;
    let mut tokens = header.split_whitespace().peekable();

    let mut shape = Vec::new();
    while let Some(token) = tokens.peek() {
        match token.parse::<usize>() {
            Ok(dim) => {
                shape.push(dim);
                tokens.next();
            }
            Err(_) => break,
        }
    }
    if shape.is_empty() {
        return Err(DataError::Parse("header has no shape entries".to_string()));
    }

    let folded = match tokens.next() {
        Some("folded") => true,
        Some("unfolded") | None => false,
        Some(other) => {
            return Err(DataError::Parse(format!(
                "expected 'folded' or 'unfolded', got '{other}'"
            )))
        }
    };
    let pop_ids: Vec<String> = tokens.map(|t| t.trim_matches('"').to_string()).collect();
    if !pop_ids.is_empty() && pop_ids.len() != shape.len() {
        return Err(DataError::Parse(format!(
            "{} labels for {} dimensions",
            pop_ids.len(),
            shape.len()
        )));
    }

    let data_line = lines
        .next()
        .ok_or_else(|| DataError::Parse("missing data line".to_string()))?;
    let values: Vec<f64> = data_line
        .split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| DataError::Parse(format!("bad cell value '{t}'")))
        })
        .collect::<Result<_, _>>()?;
    let expected: usize = shape.iter().product();
    if values.len() != expected {
        return Err(DataError::Parse(format!(
            "expected {expected} cells, got {}",
            values.len()
        )));
    }

    let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| DataError::Parse(e.to_string()))?;
    Ok(Spectrum::new(data, pop_ids, folded))
}

#[derive(Debug)]
struct SnpDefaults {
    pop_ids: Vec<String>,
    has_outgroup: bool,
    sizes: Vec<usize>,
}

/// SNP-format pipeline: infer layout and defaults from the table, let the
/// holder override them, accumulate the spectrum, then repolarize.
fn read_snp(holder: &SfsDataHolder) -> Result<Spectrum, DataError> {
    let contents = fs::read_to_string(&holder.filename)?;
    let defaults = snp_defaults(&contents)?;

    let n_pop = defaults.pop_ids.len();
    let pop_ids = holder
        .population_labels
        .clone()
        .unwrap_or_else(|| defaults.pop_ids.clone());
    if pop_ids.len() != n_pop {
        return Err(DataError::LabelMismatch {
            present: defaults.pop_ids.join(", "),
        });
    }
    let sizes = holder
        .projections
        .clone()
        .unwrap_or_else(|| defaults.sizes.clone());
    if sizes.len() != n_pop {
        return Err(DataError::Projection(format!(
            "expected {n_pop} sizes, got {}",
            sizes.len()
        )));
    }

    let mut sfs = spectrum_from_snp_rows(&contents, &pop_ids, &sizes, defaults.has_outgroup)?;
    if !defaults.has_outgroup {
        sfs = sfs.fold();
    }
    sfs.change_outgroup(holder.outgroup)
}

fn snp_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Infer population labels, outgroup presence and approximate maximum
/// sample sizes from the table. The header carries `(ncols - 6) / 2`
/// populations; a row whose outgroup-allele field has no nucleotide code in
/// the middle flags outgroup absence.
fn snp_defaults(contents: &str) -> Result<SnpDefaults, DataError> {
    let mut lines = snp_lines(contents);
    let (_, header) = lines
        .next()
        .ok_or_else(|| DataError::Parse("SNP file is empty".to_string()))?;
    let columns: Vec<&str> = header.split_whitespace().collect();
    let ncols = columns.len();
    if ncols < 6 || (ncols - 6) % 2 != 0 {
        return Err(DataError::SnpHeader { ncols });
    }
    let n_pop = (ncols - 6) / 2;
    let pop_ids: Vec<String> = columns[3..3 + n_pop].iter().map(|s| s.to_string()).collect();

    let mut has_outgroup = true;
    let mut sizes = vec![0usize; n_pop];
    for (line, row) in lines {
        let fields: Vec<&str> = row.split_whitespace().collect();
        if fields.len() != ncols {
            return Err(DataError::SnpRow {
                line,
                reason: format!("expected {ncols} columns, got {}", fields.len()),
            });
        }
        match outgroup_allele(fields[1]) {
            Some(code) if "atcg".contains(code.to_ascii_lowercase()) => {}
            _ => has_outgroup = false,
        }
        for pop in 0..n_pop {
            let derived = parse_count(fields[3 + pop], line)?;
            let ancestral = parse_count(fields[4 + n_pop + pop], line)?;
            sizes[pop] = sizes[pop].max(derived + ancestral);
        }
    }
    Ok(SnpDefaults {
        pop_ids,
        has_outgroup,
        sizes,
    })
}

fn outgroup_allele(field: &str) -> Option<char> {
    field.chars().nth(1)
}

fn parse_count(token: &str, line: usize) -> Result<usize, DataError> {
    token.parse::<usize>().map_err(|_| DataError::SnpRow {
        line,
        reason: format!("bad allele count '{token}'"),
    })
}

/// Accumulate the spectrum from the data rows, projecting each site down to
/// the target sizes with hypergeometric weights. Rows whose alleles cannot
/// be oriented against the outgroup allele are skipped, as are rows with
/// fewer calls than the target sample size.
fn spectrum_from_snp_rows(
    contents: &str,
    pop_ids: &[String],
    sizes: &[usize],
    has_outgroup: bool,
) -> Result<Spectrum, DataError> {
    let n_pop = sizes.len();
    let shape: Vec<usize> = sizes.iter().map(|&s| s + 1).collect();
    let mut data = ArrayD::<f64>::zeros(IxDyn(&shape));

    for (line, row) in snp_lines(contents).skip(1) {
        let fields: Vec<&str> = row.split_whitespace().collect();
        let allele1 = fields[2];
        let allele2 = fields[3 + n_pop];

        let mut derived = Vec::with_capacity(n_pop);
        let mut totals = Vec::with_capacity(n_pop);
        for pop in 0..n_pop {
            let count1 = parse_count(fields[3 + pop], line)?;
            let count2 = parse_count(fields[4 + n_pop + pop], line)?;
            derived.push(count1);
            totals.push(count1 + count2);
        }

        if has_outgroup {
            let ancestral = match outgroup_allele(fields[1]) {
                Some(code) => code.to_ascii_uppercase().to_string(),
                None => continue,
            };
            if ancestral == allele1.to_ascii_uppercase() {
                // allele2 is derived
                for pop in 0..n_pop {
                    derived[pop] = totals[pop] - derived[pop];
                }
            } else if ancestral != allele2.to_ascii_uppercase() {
                // cannot orient this site
                continue;
            }
        }

        if totals.iter().zip(sizes).any(|(&c, &m)| c < m) {
            continue;
        }

        // Per-population contribution of this site over the target sizes.
        let weights: Vec<Vec<f64>> = (0..n_pop)
            .map(|pop| site_weights(derived[pop], totals[pop], sizes[pop]))
            .collect();
        for idx in ndarray::indices(IxDyn(&shape)) {
            let mut w = 1.0;
            for pop in 0..n_pop {
                w *= weights[pop][idx[pop]];
                if w == 0.0 {
                    break;
                }
            }
            if w > 0.0 {
                data[idx] += w;
            }
        }
    }

    Ok(Spectrum::new(data, pop_ids.to_vec(), false))
}

/// Hypergeometric weights for drawing `j` derived alleles in a sample of
/// `m` from a site with `d` derived out of `c` calls.
fn site_weights(d: usize, c: usize, m: usize) -> Vec<f64> {
    let ln_total = ln_binomial(c as u64, m as u64);
    (0..=m)
        .map(|j| {
            if j > d || m - j > c - d {
                0.0
            } else {
                (ln_binomial(d as u64, j as u64)
                    + ln_binomial((c - d) as u64, (m - j) as u64)
                    - ln_total)
                    .exp()
            }
        })
        .collect()
}
