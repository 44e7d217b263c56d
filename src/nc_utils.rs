use ndarray::{concatenate, ArrayD, Axis, Slice};
#[cfg(feature = "netcdf")]
use netcdf::{types::{FloatType, IntType}, Extents};

/// A type that can hold a variety of arrays that might be stored
/// in a netCDF file. When the `netcdf` feature is enabled, it is best
/// created by reading from a netCDF variable with its `get_from` method.
#[derive(Debug, Clone, PartialEq)]
pub enum NcArray {
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    U64(ArrayD<u64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    Char(ArrayD<u8>),
}

/// Evaluate `$body` with `$arr` bound to the inner array, whatever the variant.
macro_rules! with_array {
    ($self:expr, $arr:ident => $body:expr) => {
        match $self {
            NcArray::I8($arr) => $body,
            NcArray::I16($arr) => $body,
            NcArray::I32($arr) => $body,
            NcArray::I64($arr) => $body,
            NcArray::U8($arr) => $body,
            NcArray::U16($arr) => $body,
            NcArray::U32($arr) => $body,
            NcArray::U64($arr) => $body,
            NcArray::F32($arr) => $body,
            NcArray::F64($arr) => $body,
            NcArray::Char($arr) => $body,
        }
    };
}

/// Like [`with_array`], but wraps the result back into the same variant.
macro_rules! map_array {
    ($self:expr, $arr:ident => $body:expr) => {
        match $self {
            NcArray::I8($arr) => NcArray::I8($body),
            NcArray::I16($arr) => NcArray::I16($body),
            NcArray::I32($arr) => NcArray::I32($body),
            NcArray::I64($arr) => NcArray::I64($body),
            NcArray::U8($arr) => NcArray::U8($body),
            NcArray::U16($arr) => NcArray::U16($body),
            NcArray::U32($arr) => NcArray::U32($body),
            NcArray::U64($arr) => NcArray::U64($body),
            NcArray::F32($arr) => NcArray::F32($body),
            NcArray::F64($arr) => NcArray::F64($body),
            NcArray::Char($arr) => NcArray::Char($body),
        }
    };
}

macro_rules! concat_variant {
    ($variant:ident, $first:expr, $rest:expr, $axis:expr) => {{
        let mut views = vec![$first.view()];
        for other in $rest {
            match other {
                NcArray::$variant(a) => views.push(a.view()),
                other => {
                    return Err(format!(
                        "cannot join {} data with {} data",
                        stringify!($variant),
                        other.type_name()
                    ))
                }
            }
        }
        concatenate(Axis($axis), &views)
            .map(NcArray::$variant)
            .map_err(|e| e.to_string())
    }};
}

impl NcArray {
    /// A short name for the data type held, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            NcArray::I8(_) => "i8",
            NcArray::I16(_) => "i16",
            NcArray::I32(_) => "i32",
            NcArray::I64(_) => "i64",
            NcArray::U8(_) => "u8",
            NcArray::U16(_) => "u16",
            NcArray::U32(_) => "u32",
            NcArray::U64(_) => "u64",
            NcArray::F32(_) => "f32",
            NcArray::F64(_) => "f64",
            NcArray::Char(_) => "char",
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, arr => arr.shape())
    }

    pub fn ndim(&self) -> usize {
        with_array!(self, arr => arr.ndim())
    }

    /// Length along `axis`. Panics if `axis` is out of bounds, same as [`ndarray::ArrayBase::len_of`].
    pub fn len_of(&self, axis: usize) -> usize {
        with_array!(self, arr => arr.len_of(Axis(axis)))
    }

    /// Return a copy of the elements `start..end` along `axis`.
    pub fn slice_axis(&self, axis: usize, start: usize, end: usize) -> NcArray {
        map_array!(self, arr => arr.slice_axis(Axis(axis), Slice::from(start..end)).to_owned())
    }

    /// Join `arrays` along `axis`. All arrays must hold the same data type
    /// and agree in shape on every other axis.
    pub fn concatenate(axis: usize, arrays: &[&NcArray]) -> Result<NcArray, String> {
        let (first, rest) = arrays
            .split_first()
            .ok_or_else(|| "no arrays given".to_string())?;
        let rest = rest.iter().copied();
        match first {
            NcArray::I8(a) => concat_variant!(I8, a, rest, axis),
            NcArray::I16(a) => concat_variant!(I16, a, rest, axis),
            NcArray::I32(a) => concat_variant!(I32, a, rest, axis),
            NcArray::I64(a) => concat_variant!(I64, a, rest, axis),
            NcArray::U8(a) => concat_variant!(U8, a, rest, axis),
            NcArray::U16(a) => concat_variant!(U16, a, rest, axis),
            NcArray::U32(a) => concat_variant!(U32, a, rest, axis),
            NcArray::U64(a) => concat_variant!(U64, a, rest, axis),
            NcArray::F32(a) => concat_variant!(F32, a, rest, axis),
            NcArray::F64(a) => concat_variant!(F64, a, rest, axis),
            NcArray::Char(a) => concat_variant!(Char, a, rest, axis),
        }
    }

    /// Convert numeric data to `f64`. Returns `None` for character data.
    pub fn to_f64(&self) -> Option<ArrayD<f64>> {
        let values = match self {
            NcArray::I8(arr) => arr.mapv(f64::from),
            NcArray::I16(arr) => arr.mapv(f64::from),
            NcArray::I32(arr) => arr.mapv(f64::from),
            NcArray::I64(arr) => arr.mapv(|v| v as f64),
            NcArray::U8(arr) => arr.mapv(f64::from),
            NcArray::U16(arr) => arr.mapv(f64::from),
            NcArray::U32(arr) => arr.mapv(f64::from),
            NcArray::U64(arr) => arr.mapv(|v| v as f64),
            NcArray::F32(arr) => arr.mapv(f64::from),
            NcArray::F64(arr) => arr.clone(),
            NcArray::Char(_) => return None,
        };
        Some(values)
    }

    /// Multiply every element by `factor`. Float arrays keep their type;
    /// integer arrays are promoted to `f64` since the result is rarely integral.
    /// Returns `None` for character data.
    pub fn scaled(&self, factor: f64) -> Option<NcArray> {
        match self {
            NcArray::F32(arr) => Some(NcArray::F32(arr.mapv(|v| (f64::from(v) * factor) as f32))),
            NcArray::F64(arr) => Some(NcArray::F64(arr.mapv(|v| v * factor))),
            NcArray::Char(_) => None,
            other => other.to_f64().map(|arr| NcArray::F64(arr * factor)),
        }
    }

    /// Store values computed in `f64` using the floating point type of `template`:
    /// single precision if the template is single precision, double otherwise.
    pub fn from_f64_like(values: ArrayD<f64>, template: &NcArray) -> NcArray {
        match template {
            NcArray::F32(_) => NcArray::F32(values.mapv(|v| v as f32)),
            _ => NcArray::F64(values),
        }
    }
}

impl From<ArrayD<f64>> for NcArray {
    fn from(value: ArrayD<f64>) -> Self {
        Self::F64(value)
    }
}

impl From<ArrayD<f32>> for NcArray {
    fn from(value: ArrayD<f32>) -> Self {
        Self::F32(value)
    }
}

impl From<ArrayD<i32>> for NcArray {
    fn from(value: ArrayD<i32>) -> Self {
        Self::I32(value)
    }
}

#[cfg(feature = "netcdf")]
impl NcArray {
    /// Retrieve data from a netCDF variable and construct the appropriate variant.
    ///
    /// Compound, opaque, enum, variable length and string types are not supported
    /// and return an error, so that callers can skip such variables.
    pub fn get_from(var: &netcdf::Variable) -> netcdf::Result<Self> {
        match var.vartype() {
            netcdf::types::NcVariableType::Compound(_)
            | netcdf::types::NcVariableType::Opaque(_)
            | netcdf::types::NcVariableType::Enum(_)
            | netcdf::types::NcVariableType::Vlen(_)
            | netcdf::types::NcVariableType::String => Err(netcdf::Error::Str(format!(
                "variable '{}' has a type that cannot be read as a generic array",
                var.name()
            ))),
            netcdf::types::NcVariableType::Int(IntType::I8) => {
                let values = var.get::<i8, _>(Extents::All)?;
                Ok(Self::I8(values))
            },
            netcdf::types::NcVariableType::Int(IntType::I16) => {
                let values = var.get::<i16, _>(Extents::All)?;
                Ok(Self::I16(values))
            },
            netcdf::types::NcVariableType::Int(IntType::I32) => {
                let values = var.get::<i32, _>(Extents::All)?;
                Ok(Self::I32(values))
            },
            netcdf::types::NcVariableType::Int(IntType::I64) => {
                let values = var.get::<i64, _>(Extents::All)?;
                Ok(Self::I64(values))
            },
            netcdf::types::NcVariableType::Int(IntType::U8) => {
                let values = var.get::<u8, _>(Extents::All)?;
                Ok(Self::U8(values))
            },
            netcdf::types::NcVariableType::Int(IntType::U16) => {
                let values = var.get::<u16, _>(Extents::All)?;
                Ok(Self::U16(values))
            },
            netcdf::types::NcVariableType::Int(IntType::U32) => {
                let values = var.get::<u32, _>(Extents::All)?;
                Ok(Self::U32(values))
            },
            netcdf::types::NcVariableType::Int(IntType::U64) => {
                let values = var.get::<u64, _>(Extents::All)?;
                Ok(Self::U64(values))
            },
            netcdf::types::NcVariableType::Float(FloatType::F32) => {
                let values = var.get::<f32, _>(Extents::All)?;
                Ok(Self::F32(values))
            },
            netcdf::types::NcVariableType::Float(FloatType::F64) => {
                let values = var.get::<f64, _>(Extents::All)?;
                Ok(Self::F64(values))
            },
            netcdf::types::NcVariableType::Char => {
                let values = var.get::<u8, _>(Extents::All)?;
                Ok(Self::Char(values))
            },
        }
    }

    /// Create a variable in a netCDF file and write this data to it.
    /// If `fill_value` is given, it is cast to this array's type and set
    /// as the variable's fill value before any data are written.
    pub fn put_to<'f>(
        &self,
        file: &'f mut netcdf::FileMut,
        name: &str,
        dims: &[&str],
        fill_value: Option<f64>,
    ) -> netcdf::Result<netcdf::VariableMut<'f>> {
        macro_rules! put_typed {
            ($t:ty, $arr:expr) => {{
                let mut var = file.add_variable::<$t>(name, dims)?;
                if let Some(fill) = fill_value {
                    var.set_fill_value(fill as $t)?;
                }
                var.put($arr.view(), Extents::All)?;
                Ok(var)
            }};
        }

        match self {
            NcArray::I8(arr) => put_typed!(i8, arr),
            NcArray::I16(arr) => put_typed!(i16, arr),
            NcArray::I32(arr) => put_typed!(i32, arr),
            NcArray::I64(arr) => put_typed!(i64, arr),
            NcArray::U8(arr) => put_typed!(u8, arr),
            NcArray::U16(arr) => put_typed!(u16, arr),
            NcArray::U32(arr) => put_typed!(u32, arr),
            NcArray::U64(arr) => put_typed!(u64, arr),
            NcArray::F32(arr) => put_typed!(f32, arr),
            NcArray::F64(arr) => put_typed!(f64, arr),
            NcArray::Char(arr) => {
                let mut var = file.add_variable::<u8>(name, dims)?;
                var.put(arr.view(), Extents::All)?;
                Ok(var)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, IxDyn};

    #[test]
    fn test_concatenate_time_axis() {
        let a = NcArray::F32(array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn());
        let b = NcArray::F32(array![[5.0f32, 6.0]].into_dyn());
        let joined = NcArray::concatenate(0, &[&a, &b]).unwrap();
        assert_eq!(joined.shape(), &[3, 2]);
        assert_eq!(
            joined,
            NcArray::F32(array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]].into_dyn())
        );
    }

    #[test]
    fn test_concatenate_mixed_types_fails() {
        let a = NcArray::F32(ArrayD::zeros(IxDyn(&[2])));
        let b = NcArray::F64(ArrayD::zeros(IxDyn(&[2])));
        assert!(NcArray::concatenate(0, &[&a, &b]).is_err());
    }

    #[test]
    fn test_scaled_keeps_float_type() {
        let a = NcArray::F32(array![1.0f32, 2.0].into_dyn());
        let s = a.scaled(1e3).unwrap();
        assert_eq!(s, NcArray::F32(array![1000.0f32, 2000.0].into_dyn()));

        let i = NcArray::I32(array![1, 2].into_dyn());
        let s = i.scaled(0.5).unwrap();
        assert_eq!(s, NcArray::F64(array![0.5, 1.0].into_dyn()));

        let c = NcArray::Char(array![b'a'].into_dyn());
        assert!(c.scaled(2.0).is_none());
    }

    #[test]
    fn test_slice_axis() {
        let a = NcArray::I32(array![[0, 1], [2, 3], [4, 5]].into_dyn());
        let s = a.slice_axis(0, 1, 3);
        assert_eq!(s, NcArray::I32(array![[2, 3], [4, 5]].into_dyn()));
        assert_eq!(a.len_of(1), 2);
    }
}
