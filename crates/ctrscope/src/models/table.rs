use serde::Serialize;
use serde_json::{Map, Value};

pub const CONTACT_ID_COLUMN: &str = "contactid";
pub const CHANNEL_COLUMN: &str = "channel";
pub const INITIATION_COLUMN: &str = "initiationtimestamp";
pub const CONNECTED_COLUMN: &str = "connectedtosystemtimestamp";
pub const DISCONNECT_COLUMN: &str = "disconnecttimestamp";
pub const LAST_UPDATE_COLUMN: &str = "lastupdatetimestamp";
pub const AGENT_COLUMN: &str = "agent";
pub const SOURCE_FILE_COLUMN: &str = "sourcefile";

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RecordTable {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    #[must_use]
    pub fn from_records<R>(records: impl IntoIterator<Item = R>, column_order: Vec<String>) -> Self
    where
        R: IntoIterator<Item = (String, Cell)>,
    {
        let mut table = Self::new(column_order);
        for record in records {
            let mut row = vec![None; table.columns.len()];
            for (key, cell) in record {
                let index = table.add_column(&key);
                if index >= row.len() {
                    row.resize(index + 1, None);
                }
                row[index] = cell;
            }
            table.push_row(row);
        }
        table
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    pub fn add_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.columns.len() - 1
    }

    pub fn set_constant_column(&mut self, name: &str, value: &str) {
        let index = self.add_column(name);
        for row in &mut self.rows {
            row[index] = Some(value.to_string());
        }
    }

    #[must_use]
    pub fn filter_rows(&self, mut predicate: impl FnMut(&[Cell]) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn row_as_json(&self, row: usize) -> Value {
        let mut object = Map::new();
        if let Some(cells) = self.rows.get(row) {
            for (column, cell) in self.columns.iter().zip(cells) {
                let value = cell.clone().map_or(Value::Null, Value::String);
                object.insert(column.clone(), value);
            }
        }
        Value::Object(object)
    }

    #[must_use]
    pub fn rows_as_json(&self) -> Vec<Value> {
        (0..self.rows.len())
            .map(|row| self.row_as_json(row))
            .collect()
    }
}
