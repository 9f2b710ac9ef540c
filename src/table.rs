//! Append-only result table: one row per county, one column per step.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};
use crate::network::CountyMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct ResultTable {
    rows: Vec<String>,
    labels: Vec<String>,
    /// Column-major: `columns[step][row]`.
    columns: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct TableParts {
    rows: Vec<String>,
    labels: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl TryFrom<TableParts> for ResultTable {
    type Error = SimulationError;

    fn try_from(parts: TableParts) -> Result<Self, Self::Error> {
        if parts.labels.len() != parts.columns.len() {
            return Err(SimulationError::TableShape {
                expected: parts.columns.len(),
                found: parts.labels.len(),
            });
        }
        if let Some(column) = parts.columns.iter().find(|column| column.len() != parts.rows.len()) {
            return Err(SimulationError::TableShape {
                expected: parts.rows.len(),
                found: column.len(),
            });
        }
        Ok(Self {
            rows: parts.rows,
            labels: parts.labels,
            columns: parts.columns,
        })
    }
}

pub fn column_label(step: usize) -> String {
    format!("month {step}")
}

impl ResultTable {
    /// Start a table whose column 0 is the current saturation of every county.
    pub fn seeded(counties: &CountyMap) -> Self {
        Self {
            rows: counties.names().map(str::to_string).collect(),
            labels: vec![column_label(0)],
            columns: vec![counties.saturations()],
        }
    }

    pub fn push_column(&mut self, values: Vec<f64>) -> SimResult<()> {
        if values.len() != self.rows.len() {
            return Err(SimulationError::TableShape {
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        self.labels.push(column_label(self.columns.len()));
        self.columns.push(values);
        Ok(())
    }

    /// Append the current saturation of every county, in table row order.
    pub fn record(&mut self, counties: &CountyMap) -> SimResult<()> {
        let values = self
            .rows
            .iter()
            .map(|name| {
                counties
                    .get(name)
                    .map(|county| county.saturation)
                    .ok_or_else(|| SimulationError::MissingNode(name.clone()))
            })
            .collect::<SimResult<Vec<_>>>()?;
        self.push_column(values)
    }

    pub fn row_names(&self) -> &[String] {
        &self.rows
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, step: usize) -> Option<&[f64]> {
        self.columns.get(step).map(Vec::as_slice)
    }

    pub fn last_column(&self) -> Option<&[f64]> {
        self.columns.last().map(Vec::as_slice)
    }

    /// Saturation series of one county across every recorded step.
    pub fn row(&self, name: &str) -> Option<Vec<f64>> {
        let position = self.rows.iter().position(|row| row == name)?;
        Some(self.columns.iter().map(|column| column[position]).collect())
    }

    pub fn value(&self, name: &str, step: usize) -> Option<f64> {
        let position = self.rows.iter().position(|row| row == name)?;
        self.columns.get(step).map(|column| column[position])
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> SimResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        let mut header = Vec::with_capacity(self.labels.len() + 1);
        header.push("County".to_string());
        header.extend(self.labels.iter().cloned());
        csv.write_record(&header)?;
        for (position, name) in self.rows.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(name.clone());
            record.extend(self.columns.iter().map(|column| column[position].to_string()));
            csv.write_record(&record)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> SimResult<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|err| SimulationError::InvalidArgument(format!("non-utf8 csv output: {err}")))
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write CSV, or JSON when the extension is `.json`.
    pub fn export(&self, path: &Path) -> SimResult<()> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if is_json {
            std::fs::write(path, self.to_json()?)?;
        } else {
            self.write_csv(File::create(path)?)?;
        }
        Ok(())
    }
}
