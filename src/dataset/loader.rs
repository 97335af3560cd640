use std::{
    collections::{BTreeSet, HashMap},
    io::Read,
    path::Path,
};

use log::debug;
use nalgebra::DVector;

use super::NeuraDataSet;
use crate::{
    encoder::NeuraEncoder,
    err::{NeuraEncoderErr, NeuraLoaderErr},
};

/// Builds a `NeuraDataSet` out of tabular data
pub trait NeuraLoader {
    /// Reads `input_count` input columns followed by `output_count` target columns
    fn load(&self, input_count: usize, output_count: usize) -> Result<NeuraDataSet, NeuraLoaderErr>;

    /// Reads `input_count` input columns followed by a class label column.
    ///
    /// Class labels are sorted lexicographically and numbered in that order; `encoder_factory`
    /// receives the number of distinct labels and builds the encoder used to produce the targets.
    fn load_classified(
        &self,
        input_count: usize,
        encoder_factory: &dyn Fn(usize) -> Result<Box<dyn NeuraEncoder>, NeuraEncoderErr>,
    ) -> Result<NeuraDataSet, NeuraLoaderErr>;
}

/// In-memory table of string cells
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeuraTableLoader {
    rows: Vec<Vec<String>>,
}

impl NeuraTableLoader {
    pub fn from_rows<R, C>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Reads every record of a CSV stream; if `skip_first` is set, the first record is treated as a header
    pub fn from_csv(reader: impl Read, skip_first: bool) -> Result<Self, NeuraLoaderErr> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(skip_first)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!("Read {} rows of CSV data", rows.len());
        Ok(Self { rows })
    }

    pub fn from_csv_path(path: impl AsRef<Path>, skip_first: bool) -> Result<Self, NeuraLoaderErr> {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        Self::from_csv(file, skip_first)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn row(&self, index: usize, min_len: usize) -> Result<&[String], NeuraLoaderErr> {
        let row = &self.rows[index];
        if row.len() < min_len {
            return Err(NeuraLoaderErr::ShortRow {
                row: index,
                expected: min_len,
                got: row.len(),
            });
        }
        Ok(row)
    }
}

fn parse_cells(row_index: usize, cells: &[String], offset: usize) -> Result<DVector<f64>, NeuraLoaderErr> {
    let values = cells
        .iter()
        .enumerate()
        .map(|(column, cell)| {
            cell.trim()
                .parse::<f64>()
                .map_err(|_| NeuraLoaderErr::InvalidNumber {
                    row: row_index,
                    column: column + offset,
                    value: cell.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DVector::from_vec(values))
}

impl NeuraLoader for NeuraTableLoader {
    fn load(&self, input_count: usize, output_count: usize) -> Result<NeuraDataSet, NeuraLoaderErr> {
        let mut inputs = Vec::with_capacity(self.rows.len());
        let mut targets = Vec::with_capacity(self.rows.len());

        for index in 0..self.rows.len() {
            let row = self.row(index, input_count + output_count)?;
            inputs.push(parse_cells(index, &row[..input_count], 0)?);
            targets.push(parse_cells(
                index,
                &row[input_count..input_count + output_count],
                input_count,
            )?);
        }

        Ok(NeuraDataSet::new(inputs, targets)?)
    }

    fn load_classified(
        &self,
        input_count: usize,
        encoder_factory: &dyn Fn(usize) -> Result<Box<dyn NeuraEncoder>, NeuraEncoderErr>,
    ) -> Result<NeuraDataSet, NeuraLoaderErr> {
        let mut inputs = Vec::with_capacity(self.rows.len());
        let mut labels = Vec::with_capacity(self.rows.len());

        for index in 0..self.rows.len() {
            let row = self.row(index, input_count + 1)?;
            inputs.push(parse_cells(index, &row[..input_count], 0)?);
            labels.push(row[input_count].as_str());
        }

        let classes: HashMap<&str, usize> = labels
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(class, label)| (label, class))
            .collect();
        debug!("Found {} distinct classes", classes.len());

        let encoder = encoder_factory(classes.len())?;
        let targets = labels
            .iter()
            .map(|label| encoder.encode(classes[label]))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NeuraDataSet::new(inputs, targets)?.with_encoder(encoder))
    }
}
