//! Strided, coercing typed views over leaf data.
//!
//! An [`Accessor`] is the one place where runtime element kinds meet a
//! statically requested type. Each read locates `element_bytes` at
//! `offset + i * stride`, reinterprets them per the leaf kind (honoring the
//! declared endianness) and converts to the requested type by the promotion
//! table: integer widening is exact, narrowing truncates, signed/unsigned
//! conversion reinterprets the bit pattern, integer/float conversion rounds
//! to nearest. Nothing is materialized; see `Node::to_data_type` for that.

use crate::error::{fatal_error, BlueprintError};
use crate::node::dtype::{DTypeId, DataType, Endianness};

/// An element value widened to its natural wide representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarValue {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl ScalarValue {
    pub fn to_i64(self) -> i64 {
        match self {
            ScalarValue::I64(v) => v,
            ScalarValue::U64(v) => v as i64,
            ScalarValue::F64(v) => v.round() as i64,
        }
    }

    pub fn to_u64(self) -> u64 {
        match self {
            ScalarValue::I64(v) => v as u64,
            ScalarValue::U64(v) => v,
            ScalarValue::F64(v) => v.round() as u64,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            ScalarValue::I64(v) => v as f64,
            ScalarValue::U64(v) => v as f64,
            ScalarValue::F64(v) => v,
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Arithmetic element types a leaf can hold or an accessor can produce.
///
/// Sealed: implemented exactly for the closed numeric kind set plus `u8`
/// doubling as `char8` payload.
pub trait Scalar:
    bytemuck::Pod + Copy + PartialEq + std::fmt::Debug + sealed::Sealed + 'static
{
    const DTYPE_ID: DTypeId;
    fn widen(self) -> ScalarValue;
    fn from_value(v: ScalarValue) -> Self;
}

macro_rules! impl_scalar_int {
    ($t:ty, $id:expr, signed) => {
        impl sealed::Sealed for $t {}
        impl Scalar for $t {
            const DTYPE_ID: DTypeId = $id;
            #[inline]
            fn widen(self) -> ScalarValue {
                ScalarValue::I64(self as i64)
            }
            #[inline]
            fn from_value(v: ScalarValue) -> Self {
                v.to_i64() as $t
            }
        }
    };
    ($t:ty, $id:expr, unsigned) => {
        impl sealed::Sealed for $t {}
        impl Scalar for $t {
            const DTYPE_ID: DTypeId = $id;
            #[inline]
            fn widen(self) -> ScalarValue {
                ScalarValue::U64(self as u64)
            }
            #[inline]
            fn from_value(v: ScalarValue) -> Self {
                v.to_u64() as $t
            }
        }
    };
}

impl_scalar_int!(i8, DTypeId::Int8, signed);
impl_scalar_int!(i16, DTypeId::Int16, signed);
impl_scalar_int!(i32, DTypeId::Int32, signed);
impl_scalar_int!(i64, DTypeId::Int64, signed);
impl_scalar_int!(u8, DTypeId::UInt8, unsigned);
impl_scalar_int!(u16, DTypeId::UInt16, unsigned);
impl_scalar_int!(u32, DTypeId::UInt32, unsigned);
impl_scalar_int!(u64, DTypeId::UInt64, unsigned);

impl sealed::Sealed for f32 {}
impl Scalar for f32 {
    const DTYPE_ID: DTypeId = DTypeId::Float32;
    #[inline]
    fn widen(self) -> ScalarValue {
        ScalarValue::F64(self as f64)
    }
    #[inline]
    fn from_value(v: ScalarValue) -> Self {
        v.to_f64() as f32
    }
}

impl sealed::Sealed for f64 {}
impl Scalar for f64 {
    const DTYPE_ID: DTypeId = DTypeId::Float64;
    #[inline]
    fn widen(self) -> ScalarValue {
        ScalarValue::F64(self)
    }
    #[inline]
    fn from_value(v: ScalarValue) -> Self {
        v.to_f64()
    }
}

macro_rules! read_prim {
    ($t:ty, $chunk:expr, $endian:expr) => {{
        let arr: [u8; std::mem::size_of::<$t>()] =
            $chunk.try_into().expect("element byte width");
        match $endian {
            Endianness::Little => <$t>::from_le_bytes(arr),
            Endianness::Big => <$t>::from_be_bytes(arr),
        }
    }};
}

/// Reinterpret element `i` of the layout `dt` within `bytes`.
pub(crate) fn read_element(
    bytes: &[u8],
    dt: &DataType,
    i: usize,
) -> Result<ScalarValue, BlueprintError> {
    if i >= dt.num_elements() {
        return Err(BlueprintError::IndexOutOfBounds { index: i, len: dt.num_elements() });
    }
    let start = dt.element_offset(i);
    let end = start + dt.element_bytes();
    let chunk = bytes
        .get(start..end)
        .ok_or(BlueprintError::LayoutOverrun { required: end, available: bytes.len() })?;
    let e = dt.endianness();
    Ok(match dt.id() {
        DTypeId::Int8 => ScalarValue::I64(chunk[0] as i8 as i64),
        DTypeId::Int16 => ScalarValue::I64(read_prim!(i16, chunk, e) as i64),
        DTypeId::Int32 => ScalarValue::I64(read_prim!(i32, chunk, e) as i64),
        DTypeId::Int64 => ScalarValue::I64(read_prim!(i64, chunk, e)),
        DTypeId::UInt8 | DTypeId::Char8 => ScalarValue::U64(chunk[0] as u64),
        DTypeId::UInt16 => ScalarValue::U64(read_prim!(u16, chunk, e) as u64),
        DTypeId::UInt32 => ScalarValue::U64(read_prim!(u32, chunk, e) as u64),
        DTypeId::UInt64 => ScalarValue::U64(read_prim!(u64, chunk, e)),
        DTypeId::Float32 => ScalarValue::F64(read_prim!(f32, chunk, e) as f64),
        DTypeId::Float64 => ScalarValue::F64(read_prim!(f64, chunk, e)),
        other => return Err(BlueprintError::NotALeaf(other)),
    })
}

macro_rules! write_prim {
    ($v:expr, $t:ty, $chunk:expr, $endian:expr) => {{
        let arr = match $endian {
            Endianness::Little => (($v) as $t).to_le_bytes(),
            Endianness::Big => (($v) as $t).to_be_bytes(),
        };
        $chunk.copy_from_slice(&arr);
    }};
}

/// Store `v` as element `i` of the layout `dt` within `bytes`, converting
/// per the promotion table.
pub(crate) fn write_element(
    bytes: &mut [u8],
    dt: &DataType,
    i: usize,
    v: ScalarValue,
) -> Result<(), BlueprintError> {
    if i >= dt.num_elements() {
        return Err(BlueprintError::IndexOutOfBounds { index: i, len: dt.num_elements() });
    }
    let start = dt.element_offset(i);
    let end = start + dt.element_bytes();
    let available = bytes.len();
    let chunk = bytes
        .get_mut(start..end)
        .ok_or(BlueprintError::LayoutOverrun { required: end, available })?;
    let e = dt.endianness();
    match dt.id() {
        DTypeId::Int8 => chunk[0] = v.to_i64() as i8 as u8,
        DTypeId::Int16 => write_prim!(v.to_i64(), i16, chunk, e),
        DTypeId::Int32 => write_prim!(v.to_i64(), i32, chunk, e),
        DTypeId::Int64 => write_prim!(v.to_i64(), i64, chunk, e),
        DTypeId::UInt8 | DTypeId::Char8 => chunk[0] = v.to_u64() as u8,
        DTypeId::UInt16 => write_prim!(v.to_u64(), u16, chunk, e),
        DTypeId::UInt32 => write_prim!(v.to_u64(), u32, chunk, e),
        DTypeId::UInt64 => write_prim!(v.to_u64(), u64, chunk, e),
        DTypeId::Float32 => write_prim!(v.to_f64(), f32, chunk, e),
        DTypeId::Float64 => write_prim!(v.to_f64(), f64, chunk, e),
        other => return Err(BlueprintError::NotALeaf(other)),
    }
    Ok(())
}

/// Non-owning, strided, coercing view over one leaf.
///
/// Out-of-range access through [`Accessor::at`] is fatal; [`Accessor::get`]
/// is the checked variant.
#[derive(Clone, Copy, Debug)]
pub struct Accessor<'a, T: Scalar> {
    bytes: &'a [u8],
    dtype: &'a DataType,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T: Scalar> Accessor<'a, T> {
    pub(crate) fn new(bytes: &'a [u8], dtype: &'a DataType) -> Self {
        Accessor { bytes, dtype, _marker: std::marker::PhantomData }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dtype.num_elements()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` converted to `T`.
    #[inline]
    pub fn at(&self, i: usize) -> T {
        match self.get(i) {
            Ok(v) => v,
            Err(e) => fatal_error!("accessor read failed: {e}"),
        }
    }

    /// Checked variant of [`Accessor::at`].
    pub fn get(&self, i: usize) -> Result<T, BlueprintError> {
        read_element(self.bytes, self.dtype, i).map(T::from_value)
    }

    /// Materialize the whole view as a converted vector.
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.at(i)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len()).map(move |i| self.at(i))
    }
}
