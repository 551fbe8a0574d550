//! Reader of raw detector events, exported as CSV with one event per row

use crate::{
    event::{MismatchedArrays, RawArm, RawEvent},
    numeric::Float,
};

use csv::StringRecord;
use thiserror::Error;

use std::{fs::File, io::Read, path::Path};

/// Errors that can occur while reading raw events
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum InputError {
    /// I/O error while opening the input
    #[error("failed to open input: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// A column is needed but absent from the header
    #[error("missing column {0}")]
    MissingColumn(String),

    /// A cell could not be decoded
    #[error("invalid value `{value}` in column {column} of event {event}")]
    InvalidValue { column: String, event: usize, value: String },

    /// Internal inconsistency of the column layout
    #[error(transparent)]
    Layout(#[from] MismatchedArrays),
}

/// Positions of the columns of one detector arm
///
/// The readout capacity of an arm is the number of `{prefix}T{i}` columns.
///
struct ArmColumns {
    t: Vec<usize>,
    x: Vec<usize>,
    y: Vec<usize>,
    flag: Vec<usize>,
    count: usize,
}
//
impl ArmColumns {
    /// Locate the columns of an arm in the CSV header
    fn locate(headers: &StringRecord, prefix: &str) -> Result<Self, InputError> {
        let time_prefix = format!("{prefix}T");
        let capacity = headers
            .iter()
            .filter_map(|name| name.trim().strip_prefix(time_prefix.as_str()))
            .filter(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
            .count();

        let find = |name: String| -> Result<usize, InputError> {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or(InputError::MissingColumn(name))
        };
        let find_all = |quantity: &str| -> Result<Vec<usize>, InputError> {
            (0..capacity).map(|i| find(format!("{prefix}{quantity}{i}"))).collect()
        };

        Ok(Self {
            t: find_all("T")?,
            x: find_all("X")?,
            y: find_all("Y")?,
            flag: find_all("Flag")?,
            count: find(format!("{prefix}Num"))?,
        })
    }

    /// Decode the readout of this arm from a CSV record
    ///
    /// Slots beyond the declared hit count are not read, and are zero-filled:
    /// acquisition software may leave them empty.
    ///
    fn decode(&self, headers: &StringRecord, record: &StringRecord, event: usize) -> Result<RawArm, InputError> {
        let invalid = |column: usize, value: String| InputError::InvalidValue {
            column: headers.get(column).unwrap_or_default().to_owned(),
            event,
            value,
        };
        let cell = |column: usize| -> Result<Float, InputError> {
            let value = record.get(column).unwrap_or_default().trim();
            value.parse::<Float>().map_err(|_| invalid(column, value.to_owned()))
        };
        let integer = |column: usize| -> Result<Float, InputError> {
            let value = cell(column)?;
            if value.fract() == 0. && value.is_finite() {
                Ok(value)
            } else {
                Err(invalid(column, value.to_string()))
            }
        };

        let count = integer(self.count)?;
        if count < 0. {
            return Err(invalid(self.count, count.to_string()));
        }
        let count = count as usize;
        let used = count.min(self.t.len());
        let floats = |columns: &[usize]| {
            columns
                .iter()
                .enumerate()
                .map(|(slot, &c)| if slot < used { cell(c) } else { Ok(0.) })
                .collect::<Result<Vec<_>, _>>()
        };
        let flag = self
            .flag
            .iter()
            .enumerate()
            .map(|(slot, &c)| if slot < used { integer(c).map(|f| f as i32) } else { Ok(0) })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RawArm::new(floats(&self.t)?, floats(&self.x)?, floats(&self.y)?, flag, count)?)
    }
}

/// Read raw events from CSV data with a header row
///
/// Ion columns are `IonT{i}`, `IonX{i}`, `IonY{i}`, `IonFlag{i}` and `IonNum`,
/// electron columns follow the same scheme with the `Elec` prefix.
///
pub fn read_events(input: impl Read) -> Result<Vec<RawEvent>, InputError> {
    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    let headers = csv_reader.headers()?.clone();
    let ions = ArmColumns::locate(&headers, "Ion")?;
    let electrons = ArmColumns::locate(&headers, "Elec")?;
    log::debug!(
        "Input provides {} ion and {} electron hit slots per event",
        ions.t.len(),
        electrons.t.len()
    );

    csv_reader
        .records()
        .enumerate()
        .map(|(event, record)| {
            let record = record?;
            Ok(RawEvent {
                ions: ions.decode(&headers, &record, event)?,
                electrons: electrons.decode(&headers, &record, event)?,
            })
        })
        .collect()
}

/// Read raw events from a CSV file
pub fn read_events_file(path: impl AsRef<Path>) -> Result<Vec<RawEvent>, InputError> {
    read_events(File::open(path)?)
}
