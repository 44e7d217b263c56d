//! An in-memory, labeled collection of netCDF-style variables.
//!
//! A [`Dataset`] holds named [`Variable`]s that share named dimensions. It is
//! deliberately small: enough to select variables, slice and join along the
//! time dimension, and edit metadata. All transformations in this crate take
//! a dataset by reference (or by value) and hand back a new one.
use std::ops::Range;

use indexmap::{IndexMap, IndexSet};

use crate::{
    cftime::TimeUnits,
    error::{DatasetError, TimeError},
    nc_utils::NcArray,
};

/// Name of the record dimension that files are concatenated along.
pub const TIME_DIM: &str = "time";

/// An attribute value attached to a variable or the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Strs(Vec<String>),
    Int(i64),
    Ints(Vec<i64>),
    Float(f32),
    Floats(Vec<f32>),
    Double(f64),
    Doubles(Vec<f64>),
}

impl AttrValue {
    /// Get this attribute as a string slice, if it is a single string
    /// (or a list with exactly one string).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            AttrValue::Strs(items) if items.len() == 1 => Some(&items[0]),
            _ => None,
        }
    }

    /// Get this attribute as a single number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(f64::from(*v)),
            AttrValue::Double(v) => Some(*v),
            AttrValue::Ints(v) if v.len() == 1 => Some(v[0] as f64),
            AttrValue::Floats(v) if v.len() == 1 => Some(f64::from(v[0])),
            AttrValue::Doubles(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// One named array in a [`Dataset`], with its dimension names and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: NcArray,
    pub attrs: IndexMap<String, AttrValue>,
}

impl Variable {
    pub fn new<S: ToString>(dims: &[S], data: NcArray) -> Self {
        Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
            attrs: IndexMap::new(),
        }
    }

    /// Builder-style helper to add an attribute.
    pub fn with_attr<V: Into<AttrValue>>(mut self, name: &str, value: V) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn set_attr<V: Into<AttrValue>>(&mut self, name: &str, value: V) {
        self.attrs.insert(name.to_string(), value.into());
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(|v| v.as_str())
    }

    pub fn units(&self) -> Option<&str> {
        self.attr_str("units")
    }

    pub fn long_name(&self) -> Option<&str> {
        self.attr_str("long_name")
    }

    /// Index of dimension `dim` in this variable, if it has it.
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    dims: IndexMap<String, usize>,
    variables: IndexMap<String, Variable>,
    pub attrs: IndexMap<String, AttrValue>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dims(&self) -> &IndexMap<String, usize> {
        &self.dims
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims.get(dim).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(|k| k.as_str())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Like [`Dataset::variable`], but with an error if the variable is missing.
    pub fn get(&self, name: &str) -> Result<&Variable, DatasetError> {
        self.variables
            .get(name)
            .ok_or_else(|| DatasetError::missing_variable(name))
    }

    /// Add or replace a variable. Its dimensions must either be new to the
    /// dataset or have the same length as the existing ones.
    pub fn insert_variable<S: ToString>(&mut self, name: S, var: Variable) -> Result<(), DatasetError> {
        let name = name.to_string();
        if var.dims.len() != var.data.ndim() {
            return Err(DatasetError::ShapeMismatch {
                varname: name,
                ndim: var.dims.len(),
                ndata: var.data.ndim(),
            });
        }

        for (dim, &len) in var.dims.iter().zip(var.data.shape()) {
            if let Some(&expected) = self.dims.get(dim) {
                if expected != len {
                    return Err(DatasetError::DimensionMismatch {
                        dim: dim.clone(),
                        varname: name,
                        expected,
                        got: len,
                    });
                }
            }
        }

        for (dim, &len) in var.dims.iter().zip(var.data.shape()) {
            self.dims.entry(dim.clone()).or_insert(len);
        }
        self.variables.insert(name, var);
        Ok(())
    }

    /// Return a dataset containing exactly the variables in `names` plus the
    /// coordinate variables (variables named after a dimension) for the
    /// dimensions they use. Any name not in this dataset is an error.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Dataset, DatasetError> {
        let mut keep: IndexSet<&str> = IndexSet::new();
        for name in names {
            let name = name.as_ref();
            let var = self.get(name)?;
            for dim in var.dims.iter() {
                if self.variables.contains_key(dim.as_str()) {
                    keep.insert(dim.as_str());
                }
            }
        }
        keep.extend(names.iter().map(|n| n.as_ref()));

        let mut out = Dataset::new();
        out.attrs = self.attrs.clone();
        for name in keep {
            out.insert_variable(name, self.get(name)?.clone())?;
        }
        Ok(out)
    }

    /// Return a copy of this dataset with only the time steps in `range` kept.
    /// Variables without a time dimension are copied unchanged.
    pub fn isel_time(&self, range: Range<usize>) -> Result<Dataset, DatasetError> {
        let ntime = self
            .dim_len(TIME_DIM)
            .ok_or_else(|| DatasetError::MissingDimension(TIME_DIM.to_string()))?;
        let start = range.start.min(ntime);
        let end = range.end.clamp(start, ntime);

        let mut out = Dataset::new();
        out.attrs = self.attrs.clone();
        for (name, var) in self.variables.iter() {
            let new_var = match var.axis_of(TIME_DIM) {
                Some(axis) => Variable {
                    dims: var.dims.clone(),
                    data: var.data.slice_axis(axis, start, end),
                    attrs: var.attrs.clone(),
                },
                None => var.clone(),
            };
            out.insert_variable(name, new_var)?;
        }
        Ok(out)
    }

    /// Join datasets along the time dimension, in the order given.
    ///
    /// Variables with a time dimension are concatenated; all others are taken
    /// from the first dataset. Global attributes come from the first dataset
    /// and variable attributes from the last one containing each variable.
    /// Every time-dependent variable in the first dataset must be present in
    /// all the others.
    pub fn concat_time(datasets: &[Dataset]) -> Result<Dataset, DatasetError> {
        let (first, rest) = datasets.split_first().ok_or(DatasetError::NothingToConcat)?;

        let mut out = Dataset::new();
        out.attrs = first.attrs.clone();
        for (name, var) in first.variables.iter() {
            let Some(axis) = var.axis_of(TIME_DIM) else {
                out.insert_variable(name, var.clone())?;
                continue;
            };

            let mut parts = vec![&var.data];
            let mut attrs = &var.attrs;
            for ds in rest {
                let other = ds.variable(name).ok_or_else(|| {
                    DatasetError::concat(name, "missing from at least one of the datasets")
                })?;
                if other.dims != var.dims {
                    return Err(DatasetError::concat(
                        name,
                        format!("dimensions differ ({:?} vs. {:?})", var.dims, other.dims),
                    ));
                }
                parts.push(&other.data);
                attrs = &other.attrs;
            }

            let data = NcArray::concatenate(axis, &parts)
                .map_err(|reason| DatasetError::concat(name, reason))?;
            out.insert_variable(
                name,
                Variable {
                    dims: var.dims.clone(),
                    data,
                    attrs: attrs.clone(),
                },
            )?;
        }

        Ok(out)
    }

    /// Decode the time coordinate into calendar dates and return the year of each step.
    pub fn time_years(&self) -> Result<Vec<i32>, TimeError> {
        let time = self.get(TIME_DIM)?;
        let units = TimeUnits::from_variable(time)?;
        let values = time
            .data
            .to_f64()
            .ok_or_else(|| DatasetError::NotNumeric(TIME_DIM.to_string()))?;
        values
            .iter()
            .map(|&v| units.decode(v).map(|dt| chrono::Datelike::year(&dt)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{monthly_dataset, scalar_field};
    use ndarray::{array, ArrayD, IxDyn};
    use rstest::rstest;

    #[test]
    fn test_insert_rejects_wrong_length() {
        let mut ds = monthly_dataset(1850, 3);
        let bad = Variable::new(&["time"], NcArray::F64(ArrayD::zeros(IxDyn(&[4]))));
        let res = ds.insert_variable("bad", bad);
        assert!(matches!(res, Err(DatasetError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_select_keeps_coordinates() {
        let mut ds = monthly_dataset(1850, 3);
        ds.insert_variable("FSNT", scalar_field(3, 1.0, "W/m2")).unwrap();
        ds.insert_variable("FLNT", scalar_field(3, 2.0, "W/m2")).unwrap();

        let sel = ds.select(&["FSNT"]).unwrap();
        let names: Vec<&str> = sel.variable_names().collect();
        assert_eq!(names, vec!["time", "FSNT"]);
    }

    #[test]
    fn test_select_missing_is_error() {
        let ds = monthly_dataset(1850, 3);
        let res = ds.select(&["NOPE"]);
        assert!(matches!(res, Err(DatasetError::MissingVariable(v)) if v == "NOPE"));
    }

    #[rstest]
    #[case(0..3, 3)]
    #[case(1..3, 2)]
    #[case(2..10, 1)]
    fn test_isel_time(#[case] range: Range<usize>, #[case] expected: usize) {
        let ds = monthly_dataset(1850, 3);
        let sub = ds.isel_time(range).unwrap();
        assert_eq!(sub.dim_len(TIME_DIM), Some(expected));
        assert_eq!(sub.get("time_bnds").unwrap().data.shape(), &[expected, 2]);
    }

    #[test]
    fn test_concat_time() {
        let a = monthly_dataset(1850, 2);
        let b = monthly_dataset(1851, 3);
        let joined = Dataset::concat_time(&[a, b]).unwrap();
        assert_eq!(joined.dim_len(TIME_DIM), Some(5));
        assert_eq!(joined.time_years().unwrap(), vec![1850, 1850, 1851, 1851, 1851]);
    }

    #[test]
    fn test_concat_requires_matching_variables() {
        let mut a = monthly_dataset(1850, 2);
        a.insert_variable("FSNT", scalar_field(2, 1.0, "W/m2")).unwrap();
        let b = monthly_dataset(1851, 2);
        let res = Dataset::concat_time(&[a, b]);
        assert!(matches!(res, Err(DatasetError::Concat { .. })));
    }

    #[test]
    fn test_attr_value_helpers() {
        assert_eq!(AttrValue::Strs(vec!["K".to_string()]).as_str(), Some("K"));
        assert_eq!(AttrValue::Floats(vec![1.5]).as_f64(), Some(1.5));
        assert_eq!(AttrValue::Ints(vec![1, 2]).as_f64(), None);
        let v = Variable::new(&["x"], NcArray::I32(array![1, 2].into_dyn())).with_attr("units", "1");
        assert_eq!(v.units(), Some("1"));
    }
}
