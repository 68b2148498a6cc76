//! Named Array + attributes + dimension-index vector (spec §4.C).

use crate::array::{ArrayData, ElementType};
use crate::attribute::DataAttributeList;
use crate::constants::RAPIO_HIDDEN;

/// One named field inside a `DataGrid`: a typed buffer, the dimension
/// indices it spans, and its own attribute list (which always carries a
/// "Units" entry mirroring `units`).
#[derive(Debug, Clone)]
pub struct DataArray {
    name: String,
    units: String,
    dim_indexes: Vec<usize>,
    data: ArrayData,
    attributes: DataAttributeList,
}

impl DataArray {
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        dim_indexes: Vec<usize>,
        data: impl Into<ArrayData>,
    ) -> Self {
        let units = units.into();
        let mut attributes = DataAttributeList::new();
        attributes.put_string("Units", units.clone());
        DataArray { name: name.into(), units, dim_indexes, data: data.into(), attributes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn set_units(&mut self, units: impl Into<String>) {
        let units = units.into();
        self.attributes.put_string("Units", units.clone());
        self.units = units;
    }

    pub fn dim_indexes(&self) -> &[usize] {
        &self.dim_indexes
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ArrayData {
        &mut self.data
    }

    pub fn replace_data(&mut self, data: impl Into<ArrayData>, dim_indexes: Vec<usize>) {
        self.data = data.into();
        self.dim_indexes = dim_indexes;
    }

    pub fn attributes(&self) -> &DataAttributeList {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut DataAttributeList {
        &mut self.attributes
    }

    /// Arrays carrying `RAPIO_HIDDEN` are skipped by generic writers
    /// (used for scratch/projection arrays and the dense array stashed
    /// away during sparse `preWrite`).
    pub fn is_hidden(&self) -> bool {
        self.attributes.contains(RAPIO_HIDDEN)
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        if hidden {
            self.attributes.put_string(RAPIO_HIDDEN, "true");
        } else {
            self.attributes.remove(RAPIO_HIDDEN);
        }
    }
}
