//! Reading history files into a [`Dataset`] and writing a [`Dataset`] back out.
use std::path::{Path, PathBuf};

use error_stack::ResultExt;
use netcdf::AttributeValue;

use crate::{
    dataset::{AttrValue, Dataset, Variable},
    error::NcIoError,
    nc_utils::NcArray,
};

const FILL_VALUE_ATTR: &str = "_FillValue";

/// Read every dimension, supported variable and attribute of a netCDF file.
///
/// Variables whose type cannot be held in an [`NcArray`] (strings, compound
/// types and the like) are skipped with a warning, as are attributes with
/// types that [`AttrValue`] does not cover.
pub fn open_dataset(path: &Path) -> error_stack::Result<Dataset, NcIoError> {
    let file = netcdf::open(path).change_context_lazy(|| NcIoError::Open(path.to_path_buf()))?;
    let mut ds = Dataset::new();

    for var in file.variables() {
        let varname = var.name();
        let data = match NcArray::get_from(&var) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Skipping variable {varname} in {}: {e}", path.display());
                continue;
            }
        };
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let mut variable = Variable::new(&dims, data);
        for attr in var.attributes() {
            let value = attr
                .value()
                .change_context_lazy(|| NcIoError::ReadVariable(varname.clone()))?;
            if let Some(value) = attr_from_netcdf(value) {
                variable.attrs.insert(attr.name().to_string(), value);
            } else {
                log::debug!("Skipping attribute {} of {varname}, unsupported type", attr.name());
            }
        }
        ds.insert_variable(&varname, variable)
            .change_context_lazy(|| NcIoError::ReadVariable(varname.clone()))?;
    }

    for attr in file.attributes() {
        let value = attr
            .value()
            .change_context_lazy(|| NcIoError::Open(path.to_path_buf()))?;
        if let Some(value) = attr_from_netcdf(value) {
            ds.attrs.insert(attr.name().to_string(), value);
        }
    }

    Ok(ds)
}

/// Open each file in turn and join them along time.
///
/// Global attributes are those of the first file and variable attributes are
/// those of the last, the same rule used when concatenating daily files.
pub fn open_mfdataset(files: &[PathBuf]) -> error_stack::Result<Dataset, NcIoError> {
    let mut datasets = Vec::with_capacity(files.len());
    for path in files {
        log::debug!("Reading {}", path.display());
        datasets.push(open_dataset(path)?);
    }
    Dataset::concat_time(&datasets).change_context(NcIoError::Merge)
}

/// Write `ds` to a new netCDF file at `path`, replacing any existing file.
pub fn write_dataset(ds: &Dataset, path: &Path) -> error_stack::Result<(), NcIoError> {
    let mut file = netcdf::create(path).change_context_lazy(|| NcIoError::Create(path.to_path_buf()))?;

    for (dimname, &len) in ds.dims() {
        file.add_dimension(dimname, len)
            .change_context_lazy(|| NcIoError::WriteDimension(dimname.clone()))?;
    }

    for (varname, var) in ds.variables() {
        let dims: Vec<&str> = var.dims.iter().map(|d| d.as_str()).collect();
        let fill_value = var.attrs.get(FILL_VALUE_ATTR).and_then(|v| v.as_f64());
        let mut nc_var = var
            .data
            .put_to(&mut file, varname, &dims, fill_value)
            .change_context_lazy(|| NcIoError::WriteVariable(varname.to_string()))?;

        // The fill value has to be set before the data are written, so put_to handles it.
        for (attname, value) in var.attrs.iter().filter(|(k, _)| *k != FILL_VALUE_ATTR) {
            nc_var
                .put_attribute(attname, attr_to_netcdf(value))
                .change_context_lazy(|| NcIoError::WriteAttribute(format!("{varname}:{attname}")))?;
        }
    }

    for (attname, value) in ds.attrs.iter() {
        file.add_attribute(attname, attr_to_netcdf(value))
            .change_context_lazy(|| NcIoError::WriteAttribute(attname.clone()))?;
    }

    Ok(())
}

fn attr_from_netcdf(value: AttributeValue) -> Option<AttrValue> {
    let value = match value {
        AttributeValue::Str(s) => AttrValue::Str(s),
        AttributeValue::Strs(s) => AttrValue::Strs(s),
        AttributeValue::Schar(v) => AttrValue::Int(v.into()),
        AttributeValue::Uchar(v) => AttrValue::Int(v.into()),
        AttributeValue::Short(v) => AttrValue::Int(v.into()),
        AttributeValue::Ushort(v) => AttrValue::Int(v.into()),
        AttributeValue::Int(v) => AttrValue::Int(v.into()),
        AttributeValue::Uint(v) => AttrValue::Int(v.into()),
        AttributeValue::Longlong(v) => AttrValue::Int(v),
        AttributeValue::Schars(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Uchars(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Shorts(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ushorts(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ints(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Uints(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Longlongs(v) => AttrValue::Ints(v),
        AttributeValue::Float(v) => AttrValue::Float(v),
        AttributeValue::Floats(v) => AttrValue::Floats(v),
        AttributeValue::Double(v) => AttrValue::Double(v),
        AttributeValue::Doubles(v) => AttrValue::Doubles(v),
        AttributeValue::Ulonglong(_) | AttributeValue::Ulonglongs(_) => return None,
    };
    Some(value)
}

fn attr_to_netcdf(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Str(s) => AttributeValue::Str(s.clone()),
        AttrValue::Strs(s) => AttributeValue::Strs(s.clone()),
        AttrValue::Int(v) => match i32::try_from(*v) {
            Ok(v) => AttributeValue::Int(v),
            Err(_) => AttributeValue::Longlong(*v),
        },
        AttrValue::Ints(v) => {
            let small: Result<Vec<i32>, _> = v.iter().map(|&x| i32::try_from(x)).collect();
            match small {
                Ok(small) => AttributeValue::Ints(small),
                Err(_) => AttributeValue::Longlongs(v.clone()),
            }
        }
        AttrValue::Float(v) => AttributeValue::Float(*v),
        AttrValue::Floats(v) => AttributeValue::Floats(v.clone()),
        AttrValue::Double(v) => AttributeValue::Double(*v),
        AttrValue::Doubles(v) => AttributeValue::Doubles(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{monthly_dataset, scalar_field};

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = monthly_dataset(2000, 3);
        ds.insert_variable("FSNT", scalar_field(3, 240.0, "W/m2").with_attr(FILL_VALUE_ATTR, AttrValue::Float(1e36)))
            .unwrap();
        ds.attrs.insert("case".to_string(), "TEST".into());
        let path = dir.path().join("out.nc");

        write_dataset(&ds, &path).unwrap();
        let back = open_dataset(&path).unwrap();

        assert_eq!(back.dim_len("time"), Some(3));
        assert_eq!(back.get("FSNT").unwrap().data, ds.get("FSNT").unwrap().data);
        assert_eq!(back.get("FSNT").unwrap().units(), Some("W/m2"));
        assert_eq!(back.get("time").unwrap().attr_str("calendar"), Some("noleap"));
        assert_eq!(back.attrs.get("case").and_then(|v| v.as_str()), Some("TEST"));
    }

    #[test]
    fn test_open_mfdataset_joins_files() {
        let dir = tempfile::tempdir().unwrap();
        let ds = monthly_dataset(2000, 4);
        let first = ds.isel_time(0..2).unwrap();
        let second = ds.isel_time(2..4).unwrap();
        let paths = vec![dir.path().join("a.nc"), dir.path().join("b.nc")];
        write_dataset(&first, &paths[0]).unwrap();
        write_dataset(&second, &paths[1]).unwrap();

        let merged = open_mfdataset(&paths).unwrap();
        assert_eq!(merged.dim_len("time"), Some(4));
        assert_eq!(merged.get("time").unwrap().data, ds.get("time").unwrap().data);
    }

    #[test]
    fn test_open_missing_file() {
        let err = open_dataset(Path::new("/nonexistent/file.nc")).unwrap_err();
        assert!(matches!(err.current_context(), NcIoError::Open(_)));
    }
}
