use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{ArrayRef, Float64Array, StringArray, TimestampSecondArray},
    datatypes::{DataType, Field as ArrowField, Schema, TimeUnit},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use time::OffsetDateTime;

use crate::error::{Error, Result};

pub const FRAME_RESPONSE: &str = "response";
pub const FIELD_TIME: &str = "time";

/// How the frontend should render a frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Visualization {
    Logs,
    Trace,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    pub preferred_visualisation_type: Visualization,
}

/// Homogeneous values of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Time(Vec<OffsetDateTime>),
    Float(Vec<f64>),
    String(Vec<String>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::Float(v) => v.len(),
            FieldValues::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldValues::Time(_) => "time",
            FieldValues::Float(_) => "number",
            FieldValues::String(_) => "string",
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            FieldValues::Time(_) => DataType::Timestamp(TimeUnit::Second, None),
            FieldValues::Float(_) => DataType::Float64,
            FieldValues::String(_) => DataType::Utf8,
        }
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            FieldValues::Time(v) => Arc::new(TimestampSecondArray::from(
                v.iter().map(|t| t.unix_timestamp()).collect::<Vec<_>>(),
            )),
            FieldValues::Float(v) => Arc::new(Float64Array::from(v.clone())),
            FieldValues::String(v) => Arc::new(StringArray::from_iter_values(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub values: FieldValues,
}

impl Field {
    pub fn time(name: impl Into<String>, values: Vec<OffsetDateTime>) -> Self {
        Self {
            name: name.into(),
            values: FieldValues::Time(values),
        }
    }

    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: FieldValues::Float(values),
        }
    }

    pub fn string(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: FieldValues::String(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Field {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", self.values.type_name())?;
        match &self.values {
            // Epoch milliseconds, as the frontend expects for time fields.
            FieldValues::Time(v) => map.serialize_entry(
                "values",
                &v.iter()
                    .map(|t| t.unix_timestamp() * 1000)
                    .collect::<Vec<_>>(),
            )?,
            FieldValues::Float(v) => map.serialize_entry("values", v)?,
            FieldValues::String(v) => map.serialize_entry("values", v)?,
        }
        map.end()
    }
}

/// A named set of equal-length typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    pub meta: Option<FrameMeta>,
    fields: Vec<Field>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: None,
            fields: Vec::new(),
        }
    }

    pub fn with_visualization(mut self, vis: Visualization) -> Self {
        self.meta = Some(FrameMeta {
            preferred_visualisation_type: vis,
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, Field::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `field`, rejecting it if its length disagrees with the frame.
    pub fn push(&mut self, field: Field) -> Result<()> {
        self.check(&field)?;
        self.fields.push(field);
        Ok(())
    }

    /// Inserts `field` as the first field.
    pub fn push_front(&mut self, field: Field) -> Result<()> {
        self.check(&field)?;
        self.fields.insert(0, field);
        Ok(())
    }

    fn check(&self, field: &Field) -> Result<()> {
        if self.fields.is_empty() || field.len() == self.len() {
            return Ok(());
        }
        Err(Error::Frame {
            frame: self.name.clone(),
            field: field.name.clone(),
            len: field.len(),
            expected: self.len(),
        })
    }

    /// Converts the frame into an arrow record batch. The frame name and
    /// meta are kept in the schema metadata.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut metadata = HashMap::from([("name".to_string(), self.name.clone())]);
        if let Some(meta) = &self.meta {
            metadata.insert(
                "preferredVisualisationType".to_string(),
                meta.preferred_visualisation_type.to_string(),
            );
        }
        let schema = Schema::new(
            self.fields
                .iter()
                .map(|f| ArrowField::new(&f.name, f.values.data_type(), false))
                .collect::<Vec<_>>(),
        )
        .with_metadata(metadata);
        let columns = self
            .fields
            .iter()
            .map(|f| f.values.to_array())
            .collect::<Vec<_>>();
        let options = RecordBatchOptions::new().with_row_count(Some(self.len()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(schema),
            columns,
            &options,
        )?)
    }
}

impl Serialize for Frame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        if let Some(meta) = &self.meta {
            map.serialize_entry("meta", meta)?;
        }
        map.serialize_entry("fields", &self.fields)?;
        map.end()
    }
}
