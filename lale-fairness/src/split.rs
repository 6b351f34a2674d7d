//! Train/test splits stratified jointly on protected groups and labels.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

use lale_core::config::SplitConfig;
use lale_core::{ConfigError, Frame, LaleError, Labels, Result};

use crate::info::FairnessInfo;

/// One `T`/`F` per protected attribute followed by one for the label.
pub fn column_for_stratification(
    x: &Frame,
    y: &Labels,
    info: &FairnessInfo,
) -> Result<Vec<String>> {
    FairnessInfo::check_lengths(x, y, "labels")?;
    let columns = info.columns(x)?;
    let flag = |b: bool| if b { 'T' } else { 'F' };
    Ok(x.rows()
        .iter()
        .zip(y)
        .map(|(row, label)| {
            info.protected_attributes
                .iter()
                .zip(&columns)
                .map(|(attr, &col)| flag(attr.is_privileged(&row[col])))
                .chain(std::iter::once(flag(info.is_favorable(label))))
                .collect()
        })
        .collect())
}

/// Row positions grouped by stratum, each group optionally shuffled.
fn strata(keys: &[String], shuffle: bool, random_state: Option<u64>) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        groups.entry(key.as_str()).or_default().push(i);
    }
    let mut groups: Vec<Vec<usize>> = groups.into_values().collect();
    if shuffle {
        let mut rng = match random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        for group in &mut groups {
            group.shuffle(&mut rng);
        }
    }
    groups
}

/// Test rows per stratum. `n_test` is shared out in proportion to stratum
/// size; the rows left over after flooring go to the largest remainders.
fn allocate(sizes: &[usize], n_test: usize) -> Vec<usize> {
    let total: usize = sizes.iter().sum();
    let mut counts: Vec<usize> = sizes.iter().map(|&len| len * n_test / total).collect();
    let mut remainders: Vec<(usize, usize)> = sizes
        .iter()
        .enumerate()
        .map(|(i, &len)| (len * n_test % total, i))
        .collect();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let extra = n_test - counts.iter().sum::<usize>();
    for &(_, i) in remainders.iter().take(extra) {
        counts[i] += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitOptions {
    pub test_size: f64,
    pub shuffle: bool,
    pub random_state: Option<u64>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::from(&SplitConfig::default())
    }
}

impl From<&SplitConfig> for SplitOptions {
    fn from(config: &SplitConfig) -> Self {
        Self {
            test_size: config.test_size,
            shuffle: config.shuffle,
            random_state: config.random_state,
        }
    }
}

/// Result of a train/test split. Indices refer to rows of the original frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FairSplit {
    pub train_x: Frame,
    pub test_x: Frame,
    pub train_y: Labels,
    pub test_y: Labels,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl FairSplit {
    /// Split another per-row slice (weights, groups, ...) the same way.
    pub fn split_aux<T: Clone>(&self, values: &[T]) -> Result<(Vec<T>, Vec<T>)> {
        let rows = self.train_indices.len() + self.test_indices.len();
        if values.len() != rows {
            return Err(LaleError::data(format!(
                "auxiliary data has {} entries but the split covers {rows} rows",
                values.len()
            )));
        }
        let pick = |indices: &[usize]| indices.iter().map(|&i| values[i].clone()).collect();
        Ok((pick(&self.train_indices), pick(&self.test_indices)))
    }
}

/// Split rows so each stratum of [`column_for_stratification`] keeps its share
/// in both halves. The test set holds `round(rows * test_size)` rows, at least
/// one and never all of them.
pub fn fair_stratified_train_test_split(
    x: &Frame,
    y: &Labels,
    info: &FairnessInfo,
    options: &SplitOptions,
) -> Result<FairSplit> {
    if !(options.test_size > 0.0 && options.test_size < 1.0) {
        return Err(
            ConfigError::invalid("test_size", "a fraction in (0, 1)", options.test_size.to_string())
                .into(),
        );
    }
    let keys = column_for_stratification(x, y, info)?;
    let rows = keys.len();
    if rows < 2 {
        return Err(LaleError::data(format!(
            "cannot split {rows} rows into non-empty train and test sets"
        )));
    }
    let n_test = ((rows as f64 * options.test_size).round() as usize).clamp(1, rows - 1);

    let groups = strata(&keys, options.shuffle, options.random_state);
    let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
    let mut train_indices = Vec::with_capacity(rows);
    let mut test_indices = Vec::with_capacity(n_test);
    for (group, take) in groups.iter().zip(allocate(&sizes, n_test)) {
        test_indices.extend_from_slice(&group[..take]);
        train_indices.extend_from_slice(&group[take..]);
    }
    train_indices.sort_unstable();
    test_indices.sort_unstable();

    tracing::debug!(
        train = train_indices.len(),
        test = test_indices.len(),
        "Fair stratified split"
    );

    let pick = |indices: &[usize]| indices.iter().map(|&i| y[i].clone()).collect::<Labels>();
    Ok(FairSplit {
        train_x: x.select_rows(&train_indices)?,
        test_x: x.select_rows(&test_indices)?,
        train_y: pick(&train_indices),
        test_y: pick(&test_indices),
        train_indices,
        test_indices,
    })
}

/// K-fold cross-validation stratified on protected groups and labels.
#[derive(Debug, Clone, PartialEq)]
pub struct FairStratifiedKFold {
    pub info: FairnessInfo,
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: Option<u64>,
}

impl FairStratifiedKFold {
    pub fn new(info: FairnessInfo, n_splits: usize) -> Self {
        Self {
            info,
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    pub fn from_config(info: FairnessInfo, config: &SplitConfig) -> Self {
        Self {
            info,
            n_splits: config.n_splits,
            shuffle: config.shuffle,
            random_state: config.random_state,
        }
    }

    pub fn shuffle(mut self, random_state: Option<u64>) -> Self {
        self.shuffle = true;
        self.random_state = random_state;
        self
    }

    /// `(train, test)` row positions per fold.
    pub fn split(&self, x: &Frame, y: &Labels) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            let found = self.n_splits.to_string();
            return Err(ConfigError::invalid("n_splits", "an integer >= 2", found).into());
        }
        if self.n_splits > x.row_count() {
            return Err(LaleError::data(format!(
                "cannot make {} folds from {} rows",
                self.n_splits,
                x.row_count()
            )));
        }
        let keys = column_for_stratification(x, y, &self.info)?;

        let mut fold_of = vec![0; x.row_count()];
        let mut next = 0;
        for group in strata(&keys, self.shuffle, self.random_state) {
            for i in group {
                fold_of[i] = next % self.n_splits;
                next += 1;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..x.row_count()).partition(|&i| fold_of[i] == fold);
                (train, test)
            })
            .collect())
    }
}
