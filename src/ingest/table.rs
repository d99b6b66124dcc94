//! Line table and column descriptors produced by ingestion

use crate::error::{Result, TabscanError};
use crate::parser::{split_plain, TextEncoding};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Metadata for one field position in the file.
///
/// Serialized with PascalCase keys so stored settings stay readable by other
/// tools that share the settings directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnDescriptor {
    pub index: usize,
    pub name: String,
    #[serde(default = "default_selected")]
    pub selected_for_output: bool,
    #[serde(default)]
    pub order_by: bool,
}

fn default_selected() -> bool {
    true
}

impl ColumnDescriptor {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            selected_for_output: true,
            order_by: false,
        }
    }
}

/// Ordered column descriptors, at most one of which is flagged `order_by`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    /// Build descriptors from a raw header line.
    ///
    /// The header is split on the delimiter without quote handling; a byte order
    /// mark is removed from the names.
    pub fn from_header(line: &[u8], delimiter: u8, encoding: TextEncoding) -> Self {
        let columns = split_plain(line, delimiter)
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let name = encoding.decode(raw).replace(BYTE_ORDER_MARK, "");
                ColumnDescriptor::new(index, name)
            })
            .collect();

        Self { columns }
    }

    pub fn from_descriptors(columns: Vec<ColumnDescriptor>) -> Self {
        let mut set = Self { columns };
        set.enforce_single_order_by();
        set
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn descriptors(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Descriptors selected for output, in file order
    pub fn selected(&self) -> Vec<ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| c.selected_for_output)
            .cloned()
            .collect()
    }

    pub fn selected_indexes(&self) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|c| c.selected_for_output)
            .map(|c| c.index)
            .collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.index)
    }

    /// Select exactly the given columns for output; unknown indexes are ignored
    pub fn select_output(&mut self, indexes: &[usize]) -> Result<()> {
        if !indexes.iter().any(|&i| i < self.columns.len()) {
            return Err(TabscanError::invalid_argument(
                "at least one existing column must be selected for output",
            ));
        }
        for column in &mut self.columns {
            column.selected_for_output = indexes.contains(&column.index);
        }
        Ok(())
    }

    /// Make `index` the only order-by column, or clear ordering with `None`
    pub fn set_order_by(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(index) = index {
            if index >= self.columns.len() {
                return Err(TabscanError::invalid_argument(format!(
                    "column {index} does not exist ({} columns)",
                    self.columns.len()
                )));
            }
        }
        for column in &mut self.columns {
            column.order_by = Some(column.index) == index;
        }
        Ok(())
    }

    pub fn order_by_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.order_by)
    }

    /// Every column selected, no ordering
    pub fn reset(&mut self) {
        for column in &mut self.columns {
            column.selected_for_output = true;
            column.order_by = false;
        }
    }

    /// Overwrite with previously stored descriptors for the same file layout.
    ///
    /// Stored descriptors must list every column once, in file order.
    pub fn replace(&mut self, stored: Vec<ColumnDescriptor>) -> Result<()> {
        if stored.len() != self.columns.len() {
            return Err(TabscanError::settings(format!(
                "stored settings describe {} columns but the file has {}",
                stored.len(),
                self.columns.len()
            )));
        }
        if let Some((position, column)) = stored
            .iter()
            .enumerate()
            .find(|(position, column)| column.index != *position)
        {
            return Err(TabscanError::settings(format!(
                "stored column '{}' has index {} at position {position}",
                column.name, column.index
            )));
        }
        self.columns = stored;
        self.enforce_single_order_by();
        Ok(())
    }

    fn enforce_single_order_by(&mut self) {
        let mut seen = false;
        for column in &mut self.columns {
            if column.order_by {
                column.order_by = !seen;
                seen = true;
            }
        }
    }
}

/// One data line of the file, or nothing if the slot was never written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineSlot(Option<Box<[u8]>>);

impl LineSlot {
    pub fn new(raw: impl Into<Box<[u8]>>) -> Self {
        Self(Some(raw.into()))
    }

    /// Raw bytes, if the slot has been written
    pub fn raw(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }

    /// True for unset slots and for lines with no bytes
    pub fn is_empty(&self) -> bool {
        self.0.as_deref().map_or(true, <[u8]>::is_empty)
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

/// Data lines in original file order, header excluded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineTable {
    slots: Vec<LineSlot>,
}

impl LineTable {
    /// Table with every line already populated
    pub fn from_lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Box<[u8]>>,
    {
        Self {
            slots: lines.into_iter().map(LineSlot::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LineSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[LineSlot] {
        &self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineSlot> {
        self.slots.iter()
    }
}

/// Pre-sized table that workers fill concurrently.
///
/// Every slot can be written exactly once. Workers write disjoint offset ranges, so
/// no lock guards the table; a second write to the same slot is reported as an
/// invariant violation instead of silently replacing data.
#[derive(Debug)]
pub struct LineTableBuilder {
    slots: Vec<OnceLock<Box<[u8]>>>,
}

impl LineTableBuilder {
    pub fn new(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, OnceLock::new);
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write `lines` into consecutive slots starting at `offset`
    pub fn fill(&self, offset: usize, lines: Vec<Box<[u8]>>) -> Result<()> {
        let end = offset + lines.len();
        if end > self.slots.len() {
            return Err(TabscanError::invariant(format!(
                "batch at offset {offset} with {} lines overruns line table of {} slots",
                lines.len(),
                self.slots.len()
            )));
        }

        for (slot, line) in self.slots[offset..end].iter().zip(lines) {
            slot.set(line).map_err(|_| {
                TabscanError::invariant(format!("line slot in batch at {offset} written twice"))
            })?;
        }
        Ok(())
    }

    pub fn into_table(self) -> LineTable {
        LineTable {
            slots: self
                .slots
                .into_iter()
                .map(|slot| LineSlot(slot.into_inner()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(lines: &[&str]) -> Vec<Box<[u8]>> {
        lines.iter().map(|l| l.as_bytes().into()).collect()
    }

    #[test]
    fn test_header_columns() {
        let columns = ColumnSet::from_header(b"id;fruit;color", b';', TextEncoding::Utf8);
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "fruit", "color"]);
        assert!(columns.iter().all(|c| c.selected_for_output && !c.order_by));
        assert_eq!(columns.get(2).unwrap().index, 2);
    }

    #[test]
    fn test_header_strips_bom_and_keeps_empty_names() {
        let header = "\u{FEFF}id;;name".as_bytes();
        let columns = ColumnSet::from_header(header, b';', TextEncoding::Utf8);
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "", "name"]);
    }

    #[test]
    fn test_select_output() {
        let mut columns = ColumnSet::from_header(b"a;b;c", b';', TextEncoding::Utf8);
        columns.select_output(&[0, 2, 99]).unwrap();
        assert_eq!(columns.selected_indexes(), vec![0, 2]);
        assert!(columns.select_output(&[42]).is_err());
        assert_eq!(columns.selected_indexes(), vec![0, 2]);
    }

    #[test]
    fn test_order_by_is_exclusive() {
        let mut columns = ColumnSet::from_header(b"a;b;c", b';', TextEncoding::Utf8);
        columns.set_order_by(Some(0)).unwrap();
        columns.set_order_by(Some(2)).unwrap();
        assert_eq!(columns.order_by_column().unwrap().index, 2);
        assert_eq!(columns.iter().filter(|c| c.order_by).count(), 1);

        columns.set_order_by(None).unwrap();
        assert!(columns.order_by_column().is_none());
        assert!(columns.set_order_by(Some(3)).is_err());
    }

    #[test]
    fn test_reset() {
        let mut columns = ColumnSet::from_header(b"a;b", b';', TextEncoding::Utf8);
        columns.select_output(&[1]).unwrap();
        columns.set_order_by(Some(1)).unwrap();
        columns.reset();
        assert_eq!(columns.selected_indexes(), vec![0, 1]);
        assert!(columns.order_by_column().is_none());
    }

    #[test]
    fn test_replace_with_stored() {
        let mut columns = ColumnSet::from_header(b"a;b", b';', TextEncoding::Utf8);
        let mut stored = columns.descriptors().to_vec();
        stored[0].selected_for_output = false;
        stored[0].order_by = true;
        stored[1].order_by = true;

        columns.replace(stored).unwrap();
        assert_eq!(columns.selected_indexes(), vec![1]);
        assert_eq!(columns.order_by_column().unwrap().index, 0);
        assert_eq!(columns.iter().filter(|c| c.order_by).count(), 1);

        assert!(columns.replace(vec![ColumnDescriptor::new(0, "a")]).is_err());
    }

    #[test]
    fn test_replace_rejects_duplicate_or_reordered_indexes() {
        let mut columns = ColumnSet::from_header(b"id;fruit;color", b';', TextEncoding::Utf8);
        let before = columns.clone();

        let duplicated = vec![
            ColumnDescriptor::new(0, "id"),
            ColumnDescriptor::new(0, "id"),
            ColumnDescriptor::new(1, "fruit"),
        ];
        let err = columns.replace(duplicated).unwrap_err();
        assert!(matches!(err, TabscanError::SettingsError { .. }));

        let mut reordered = vec![
            ColumnDescriptor::new(1, "fruit"),
            ColumnDescriptor::new(0, "id"),
            ColumnDescriptor::new(2, "color"),
        ];
        reordered[0].order_by = true;
        assert!(columns.replace(reordered).is_err());

        assert_eq!(columns, before);
    }

    #[test]
    fn test_descriptor_json_shape() {
        let json = serde_json::to_string(&ColumnDescriptor::new(1, "fruit")).unwrap();
        assert_eq!(
            json,
            r#"{"Index":1,"Name":"fruit","SelectedForOutput":true,"OrderBy":false}"#
        );

        let parsed: ColumnDescriptor = serde_json::from_str(r#"{"Index":0,"Name":"id"}"#).unwrap();
        assert!(parsed.selected_for_output);
        assert!(!parsed.order_by);
    }

    #[test]
    fn test_slot_states() {
        assert!(LineSlot::default().is_empty());
        assert!(!LineSlot::default().is_set());
        assert!(LineSlot::new(Vec::new()).is_empty());
        assert!(LineSlot::new(Vec::new()).is_set());
        assert_eq!(LineSlot::new(b"x".to_vec()).raw(), Some(&b"x"[..]));
    }

    #[test]
    fn test_builder_fills_at_offsets() {
        let builder = LineTableBuilder::new(4);
        builder.fill(2, boxed(&["c", "d"])).unwrap();
        builder.fill(0, boxed(&["a", "b"])).unwrap();

        let table = builder.into_table();
        let lines: Vec<_> = table.iter().map(|s| s.raw().unwrap().to_vec()).collect();
        assert_eq!(lines, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
    }

    #[test]
    fn test_builder_rejects_double_write_and_overrun() {
        let builder = LineTableBuilder::new(2);
        builder.fill(0, boxed(&["a"])).unwrap();

        let err = builder.fill(0, boxed(&["again"])).unwrap_err();
        assert!(err.is_invariant_violation());

        let err = builder.fill(1, boxed(&["b", "c"])).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_unwritten_slots_stay_empty() {
        let builder = LineTableBuilder::new(3);
        builder.fill(0, boxed(&["a"])).unwrap();
        let table = builder.into_table();
        assert_eq!(table.len(), 3);
        assert!(table.get(1).unwrap().is_empty());
        assert!(!table.get(1).unwrap().is_set());
    }
}
