//! Tabular output for crawled records (CSV, JSON).

use crate::config::{OutputFormat, Schema};
use crate::error::Result;
use crate::site::models::ProductRecord;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output file name inside each site's directory (without extension).
const FILE_STEM: &str = "products";

const CATALOG_HEADER: [&str; 9] = [
    "Website",
    "Name",
    "Price",
    "Category",
    "Sub-Category",
    "Image URL",
    "Image Path",
    "Short Description",
    "Long Description",
];

const PRODUCT_HEADER: [&str; 8] = [
    "name",
    "sku",
    "category",
    "short_description",
    "long_description",
    "image_url",
    "price",
    "product_url",
];

impl Schema {
    /// Column names, in order.
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Schema::Catalog => &CATALOG_HEADER,
            Schema::Product => &PRODUCT_HEADER,
        }
    }

    /// Flattens a record into this schema's columns.
    pub fn row<'a>(&self, website: &'a str, record: &'a ProductRecord) -> Vec<&'a str> {
        match self {
            Schema::Catalog => vec![
                website,
                &record.name,
                &record.price,
                &record.category,
                &record.sub_category,
                &record.image_url,
                &record.image_path,
                &record.short_description,
                &record.long_description,
            ],
            Schema::Product => vec![
                &record.name,
                &record.sku,
                &record.category,
                &record.short_description,
                &record.long_description,
                &record.image_url,
                &record.price,
                &record.source_url,
            ],
        }
    }
}

/// JSON form of a record, tagged with its site.
#[derive(Serialize)]
struct JsonRow<'a> {
    website: &'a str,
    #[serde(flatten)]
    record: &'a ProductRecord,
}

/// Writes records in the configured schema and format.
pub struct Exporter {
    schema: Schema,
    format: OutputFormat,
}

impl Exporter {
    /// Creates a new exporter.
    pub fn new(schema: Schema, format: OutputFormat) -> Self {
        Self { schema, format }
    }

    /// Writes `records` to `writer`.
    ///
    /// CSV follows the schema's columns. JSON carries every record field.
    pub fn write<W: Write>(&self, writer: W, website: &str, records: &[ProductRecord]) -> Result<()> {
        match self.format {
            OutputFormat::Csv => self.write_csv(writer, website, records),
            OutputFormat::Json => self.write_json(writer, website, records),
        }
    }

    /// Writes a site's records to `<dir>/<slug>/products.<ext>`.
    ///
    /// Returns `None` without touching the filesystem when there is nothing
    /// to write.
    pub fn save(
        &self,
        dir: &Path,
        slug: &str,
        website: &str,
        records: &[ProductRecord],
    ) -> Result<Option<PathBuf>> {
        if records.is_empty() {
            debug!("No records for {}, skipping output", website);
            return Ok(None);
        }

        let site_dir = dir.join(slug);
        std::fs::create_dir_all(&site_dir)?;

        let path = site_dir.join(format!("{}.{}", FILE_STEM, self.format.extension()));
        let file = BufWriter::new(File::create(&path)?);
        self.write(file, website, records)?;

        info!("Wrote {} records to {}", records.len(), path.display());
        Ok(Some(path))
    }

    fn write_csv<W: Write>(&self, writer: W, website: &str, records: &[ProductRecord]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.schema.header())?;
        for record in records {
            csv.write_record(self.schema.row(website, record))?;
        }
        csv.flush()?;
        Ok(())
    }

    fn write_json<W: Write>(&self, mut writer: W, website: &str, records: &[ProductRecord]) -> Result<()> {
        let rows: Vec<JsonRow> = records.iter().map(|record| JsonRow { website, record }).collect();
        serde_json::to_writer_pretty(&mut writer, &rows)?;
        writer.flush()?;
        Ok(())
    }
}
