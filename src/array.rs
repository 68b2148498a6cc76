//! Typed N-dimensional row-major storage (spec §4.A).
//!
//! `original_source/base/rDataStore.h` hand-rolls a malloc/realloc buffer
//! with the full C++ rule-of-six; `Vec<T>` already gives us that, so
//! `Array<T>` is a thin shape-aware wrapper around one.

use std::fmt::Display;
use std::io::{self, Write};

/// The five scalar element types a DataArray may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Byte,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Byte => "byte",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }
}

/// Marker trait tying a Rust scalar to its `ElementType` tag.
pub trait ArrayElement: Copy + Default + Display + 'static {
    const ELEMENT_TYPE: ElementType;
}

impl ArrayElement for u8 {
    const ELEMENT_TYPE: ElementType = ElementType::Byte;
}
impl ArrayElement for i16 {
    const ELEMENT_TYPE: ElementType = ElementType::Int16;
}
impl ArrayElement for i32 {
    const ELEMENT_TYPE: ElementType = ElementType::Int32;
}
impl ArrayElement for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::Float32;
}
impl ArrayElement for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::Float64;
}

/// A fixed-shape, row-major buffer of one of the five scalar element types.
///
/// Rank is unconstrained here (generic DataGrid use); the geospatial
/// specializations restrict themselves to rank 1-3.
#[derive(Debug, Clone)]
pub struct Array<T: ArrayElement> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: ArrayElement> Array<T> {
    /// Allocates a zero/default-filled array of the given shape.
    pub fn new(shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Array { shape, data: vec![T::default(); len] }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Builds an array directly from a flat, already row-major `Vec`.
    /// Panics if `data.len()` doesn't match the product of `shape`.
    pub fn from_flat(shape: Vec<usize>, data: Vec<T>) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(data.len(), expected, "flat data length must match shape product");
        Array { shape, data }
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    fn flat_index(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.shape.len(), "index rank must match array rank");
        let mut flat = 0usize;
        for (i, &dim) in self.shape.iter().enumerate() {
            debug_assert!(index[i] < dim, "index out of bounds");
            flat = flat * dim + index[i];
        }
        flat
    }

    pub fn get(&self, index: &[usize]) -> T {
        self.data[self.flat_index(index)]
    }

    pub fn set(&mut self, index: &[usize], value: T) {
        let flat = self.flat_index(index);
        self.data[flat] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Raw pointer for bulk codec/I/O use. Caller honors `shape`; no
    /// bounds checking happens on this path.
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    /// Space-separated, row-wrapped dump (trailing separators suppressed),
    /// used by the text/dump specializer (spec §4.I).
    pub fn print_array(&self, out: &mut impl Write) -> io::Result<()> {
        if self.shape.is_empty() {
            return Ok(());
        }
        let row_len = *self.shape.last().unwrap();
        if row_len == 0 {
            return Ok(());
        }
        for (i, chunk) in self.data.chunks(row_len).enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            for (j, v) in chunk.iter().enumerate() {
                if j > 0 {
                    write!(out, " ")?;
                }
                write!(out, "{}", v)?;
            }
        }
        Ok(())
    }
}

/// Type-erased holder for one of the five `Array<T>` variants, letting
/// `DataArray` store heterogeneous element types in one collection.
#[derive(Debug, Clone)]
pub enum ArrayData {
    Byte(Array<u8>),
    Int16(Array<i16>),
    Int32(Array<i32>),
    Float32(Array<f32>),
    Float64(Array<f64>),
}

impl ArrayData {
    pub fn element_type(&self) -> ElementType {
        match self {
            ArrayData::Byte(_) => ElementType::Byte,
            ArrayData::Int16(_) => ElementType::Int16,
            ArrayData::Int32(_) => ElementType::Int32,
            ArrayData::Float32(_) => ElementType::Float32,
            ArrayData::Float64(_) => ElementType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            ArrayData::Byte(a) => a.shape(),
            ArrayData::Int16(a) => a.shape(),
            ArrayData::Int32(a) => a.shape(),
            ArrayData::Float32(a) => a.shape(),
            ArrayData::Float64(a) => a.shape(),
        }
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn print_array(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            ArrayData::Byte(a) => a.print_array(out),
            ArrayData::Int16(a) => a.print_array(out),
            ArrayData::Int32(a) => a.print_array(out),
            ArrayData::Float32(a) => a.print_array(out),
            ArrayData::Float64(a) => a.print_array(out),
        }
    }

    pub fn as_f32(&self) -> Option<&Array<f32>> {
        match self {
            ArrayData::Float32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f32_mut(&mut self) -> Option<&mut Array<f32>> {
        match self {
            ArrayData::Float32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&Array<f64>> {
        match self {
            ArrayData::Float64(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f64_mut(&mut self) -> Option<&mut Array<f64>> {
        match self {
            ArrayData::Float64(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&Array<i32>> {
        match self {
            ArrayData::Int32(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Array<f32>> for ArrayData {
    fn from(a: Array<f32>) -> Self {
        ArrayData::Float32(a)
    }
}
impl From<Array<f64>> for ArrayData {
    fn from(a: Array<f64>) -> Self {
        ArrayData::Float64(a)
    }
}
impl From<Array<i32>> for ArrayData {
    fn from(a: Array<i32>) -> Self {
        ArrayData::Int32(a)
    }
}
impl From<Array<i16>> for ArrayData {
    fn from(a: Array<i16>) -> Self {
        ArrayData::Int16(a)
    }
}
impl From<Array<u8>> for ArrayData {
    fn from(a: Array<u8>) -> Self {
        ArrayData::Byte(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_get_roundtrip() {
        let mut a: Array<f32> = Array::new([2, 3]);
        a.fill(7.5);
        assert_eq!(a.get(&[1, 2]), 7.5);
        a.set(&[0, 0], 1.0);
        assert_eq!(a.get(&[0, 0]), 1.0);
        assert_eq!(a.get(&[1, 2]), 7.5);
    }

    #[test]
    fn row_major_layout() {
        let mut a: Array<i32> = Array::new([2, 2]);
        a.set(&[0, 0], 1);
        a.set(&[0, 1], 2);
        a.set(&[1, 0], 3);
        a.set(&[1, 1], 4);
        assert_eq!(a.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn print_array_wraps_rows() {
        let mut a: Array<i32> = Array::new([2, 3]);
        for i in 0..6 {
            a.as_mut_slice()[i] = i as i32;
        }
        let mut buf = Vec::new();
        a.print_array(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "0 1 2\n3 4 5");
    }
}
