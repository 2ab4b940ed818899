//! Tabular metadata keyed by taxon.
//!
//! Tree operations never read metadata themselves; commands use a
//! [`MetadataIndex`] to decide what to pass to them (insertion destinations,
//! tip attributes, new labels).

use indexmap::IndexMap;
use std::io::Write;
use std::path::Path;

/// One row of a metadata table, fields in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new(fields: IndexMap<String, String>) -> Self {
        Self { fields }
    }

    /// Value of a named field. Empty cells count as absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Lookup of records by key.
pub trait MetadataIndex {
    fn lookup(&self, key: &str) -> Option<&Record>;

    /// All keys, in file order.
    fn keys(&self) -> Vec<&str>;
}

/// A CSV or TSV file with a header row, indexed by one column.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    index: String,
    rows: IndexMap<String, Record>,
}

/// Split one line on `delimiter`, honoring double-quoted cells.
/// A doubled quote inside a quoted cell stands for one quote.
pub fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            _ if c == delimiter && !in_quotes => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);

    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

/// Join cells into one line, quoting cells that hold the delimiter or a quote.
pub fn join_record<S: AsRef<str>>(cells: &[S], delimiter: char) -> String {
    cells
        .iter()
        .map(|cell| {
            let cell = cell.as_ref();
            if cell.contains(delimiter) || cell.contains('"') {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

/// `,` for `.csv` files, tab for everything else.
pub fn delimiter_for(path: &str) -> char {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ',',
        _ => '\t',
    }
}

impl Table {
    /// Build a table from already split rows, the first being the header.
    ///
    /// `index` names the key column; `None` uses the first column.
    pub fn from_rows(rows: Vec<Vec<String>>, index: Option<&str>) -> anyhow::Result<Self> {
        let mut iter = rows.into_iter();
        let columns = iter
            .next()
            .ok_or_else(|| anyhow::anyhow!("Metadata table is empty"))?;

        let index = match index {
            Some(name) => name.to_string(),
            None => columns
                .first()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Metadata table has no columns"))?,
        };
        let index_pos = columns
            .iter()
            .position(|c| *c == index)
            .ok_or_else(|| anyhow::anyhow!("Index column, {}, not found in metadata", index))?;

        let mut table = Table {
            columns,
            index,
            rows: IndexMap::new(),
        };

        for cells in iter {
            let key = match cells.get(index_pos) {
                Some(k) if !k.is_empty() => k.clone(),
                _ => continue,
            };
            let fields: IndexMap<String, String> = table
                .columns
                .iter()
                .cloned()
                .zip(cells.into_iter().chain(std::iter::repeat(String::new())))
                .collect();
            if table.rows.insert(key.clone(), Record::new(fields)).is_some() {
                log::warn!("Duplicate metadata key, {}, the last row wins", key);
            }
        }

        Ok(table)
    }

    /// Load a delimited file. The delimiter follows the file extension.
    pub fn from_file(infile: &str, index: Option<&str>) -> anyhow::Result<Self> {
        let delimiter = delimiter_for(infile);
        let rows: Vec<Vec<String>> = intspan::read_lines(infile)
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| split_record(line, delimiter))
            .collect();
        Self::from_rows(rows, index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index_column(&self) -> &str {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the header and the rows of `keys`, in that order. Keys without
    /// a row are passed over. Returns the number of rows written.
    pub fn write_rows<S: AsRef<str>>(
        &self,
        writer: &mut dyn Write,
        keys: &[S],
        delimiter: char,
    ) -> anyhow::Result<usize> {
        writeln!(writer, "{}", join_record(&self.columns, delimiter))?;

        let mut written = 0;
        for key in keys {
            if let Some(record) = self.rows.get(key.as_ref()) {
                let cells: Vec<&str> = record.fields().map(|(_, v)| v).collect();
                writeln!(writer, "{}", join_record(&cells, delimiter))?;
                written += 1;
            }
        }
        Ok(written)
    }
}

impl MetadataIndex for Table {
    fn lookup(&self, key: &str) -> Option<&Record> {
        self.rows.get(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.rows.keys().map(|k| k.as_str()).collect()
    }
}

/// The metadata key inside a tip name.
///
/// Fields are 1-based after splitting on `delimiter`; field 0 is the whole
/// name. A field past the end yields `None`.
///
/// ```
/// use clade::libs::metadata::taxon_key;
/// assert_eq!(taxon_key("hCoV-19/UK/ABC|EPI_1|2021-01-02", 2, '|'), Some("EPI_1"));
/// assert_eq!(taxon_key("A", 0, '|'), Some("A"));
/// assert_eq!(taxon_key("A|B", 3, '|'), None);
/// ```
pub fn taxon_key(name: &str, field: usize, delimiter: char) -> Option<&str> {
    if field == 0 {
        return Some(name);
    }
    name.split(delimiter).nth(field - 1).map(|s| s.trim())
}
