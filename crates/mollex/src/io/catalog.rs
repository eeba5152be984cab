//! Semicolon-delimited specimen catalogs.
//!
//! Input rows carry 13 metadata columns, one ignored column and then any
//! number of photograph entries (`<name>.<ext>`). Every non-empty entry
//! becomes its own [`Job`]; jobs from one row share the metadata.
//!
//! The output catalog has one row per extracted segment:
//! generated file name, `#rrggbb` colour, rotation and ratio placeholders,
//! the original photograph entry and the 13 metadata columns.

use std::{
    borrow::Cow,
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::warn;
use crate::{
    error::Result,
    types::{HexColor, Segment},
};

pub const METADATA_COLUMNS: usize = 13;

/// Metadata columns plus the ignored column that precedes the photo entries.
const LEADING_COLUMNS: usize = METADATA_COLUMNS + 1;

pub const OUTPUT_HEADER: &str = "Image;Color;Rotation;Ratio;OriginalImage;InventarNr;Class;Family;Genus;Species;Scientific Name;Fundort;Datum;Gebiet;Provinz;Land;Teilkontinent;Kontinent";

/// One photograph to process together with its specimen metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Photograph entry as written in the catalog, extension included.
    pub image: String,
    pub metadata: Arc<[String]>,
}

impl Job {
    /// File stem identifying the photograph.
    pub fn stem(&self) -> &str {
        Path::new(&self.image)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.image)
    }

    /// Where the photograph is read from: `<input_dir>/<stem>.jpg`.
    pub fn photo_path(&self, input_dir: &Path) -> PathBuf {
        input_dir.join(format!("{}.jpg", self.stem()))
    }
}

/// Read jobs from an input catalog file
pub fn read_jobs<P: AsRef<Path>>(path: P) -> Result<Vec<Job>> {
    let file = File::open(path)?;
    parse_jobs(BufReader::new(file))
}

/// Parse jobs from catalog text. The first line is a header.
///
/// Lines that are not valid UTF-8 are decoded as Latin-1 so legacy catalogs
/// keep their metadata instead of aborting the run.
pub fn parse_jobs<R: BufRead>(mut reader: R) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    let mut raw = Vec::new();
    let mut number = 0;
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        number += 1;
        if number == 1 {
            continue;
        }
        let line = decode_line(&raw, number);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() < LEADING_COLUMNS {
            warn!(
                line = number,
                columns = fields.len(),
                "skipping catalog row with too few columns"
            );
            continue;
        }

        let metadata: Arc<[String]> = fields[..METADATA_COLUMNS]
            .iter()
            .map(|field| field.to_string())
            .collect();
        jobs.extend(
            fields[LEADING_COLUMNS..]
                .iter()
                .map(|entry| entry.trim())
                .filter(|entry| !entry.is_empty())
                .map(|entry| Job {
                    image: entry.to_string(),
                    metadata: Arc::clone(&metadata),
                }),
        );
    }
    Ok(jobs)
}

fn decode_line(raw: &[u8], number: usize) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            warn!(line = number, "catalog line is not UTF-8; decoding as Latin-1");
            Cow::Owned(raw.iter().map(|&byte| char::from(byte)).collect())
        }
    }
}

/// One output catalog line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub image: String,
    pub color: Option<HexColor>,
    pub original_image: String,
    pub metadata: Arc<[String]>,
}

impl CatalogRow {
    pub fn new(segment: &Segment, job: &Job) -> Self {
        Self {
            image: segment.file_name(),
            color: segment.color,
            original_image: job.image.clone(),
            metadata: Arc::clone(&job.metadata),
        }
    }
}

impl fmt::Display for CatalogRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.image)?;
        if let Some(color) = self.color {
            write!(f, "#{color}")?;
        }
        write!(f, ";0.0;1.0;{}", self.original_image)?;
        for column in self.metadata.iter() {
            write!(f, ";{column}")?;
        }
        Ok(())
    }
}

/// Appends rows to an output catalog, one job at a time.
pub struct CatalogWriter<W: Write> {
    inner: BufWriter<W>,
    rows: usize,
}

impl CatalogWriter<File> {
    /// Create (or truncate) a catalog file and write its header
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::create(path)?)?)
    }
}

impl<W: Write> CatalogWriter<W> {
    pub fn new(inner: W) -> io::Result<Self> {
        let mut inner = BufWriter::new(inner);
        writeln!(inner, "{OUTPUT_HEADER}")?;
        Ok(Self { inner, rows: 0 })
    }

    /// Write all rows of one job with a single write.
    pub fn append(&mut self, rows: &[CatalogRow]) -> io::Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let block: String = rows.iter().map(|row| format!("{row}\n")).collect();
        self.inner.write_all(block.as_bytes())?;
        self.rows += rows.len();
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flush and hand back the underlying writer
    pub fn finish(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|err| err.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    const CATALOG: &str = "\
InventarNr;Class;Family;Genus;Species;Scientific Name;Fundort;Datum;Gebiet;Provinz;Land;Teilkontinent;Kontinent;Bilder;Images
M-1;Gastropoda;Conidae;Conus;textile;Conus textile;Reef;1901;Pacific;;Fiji;Melanesia;Oceania;x;M-1a.jpg;;M-1b.JPG\r
M-2;Bivalvia;Cardiidae;Cardium;edule;Cardium edule;Beach;1899;North Sea;;Germany;;Europe;x
short;row

M-3;Bivalvia;Ostreidae;Ostrea;edulis;Ostrea edulis;Bay;1920;;;France;;Europe;x; M-3.jpg
";

    fn segment(source: &str, index: usize, color: Option<HexColor>) -> Segment {
        Segment {
            source: source.to_string(),
            index,
            image: RgbaImage::new(1, 1),
            color,
            rect: None,
        }
    }

    #[test]
    fn parses_one_job_per_photo_entry() {
        let jobs = parse_jobs(CATALOG.as_bytes()).unwrap();
        let images: Vec<&str> = jobs.iter().map(|job| job.image.as_str()).collect();
        assert_eq!(images, vec!["M-1a.jpg", "M-1b.JPG", "M-3.jpg"]);
        assert_eq!(jobs[0].metadata.len(), METADATA_COLUMNS);
        assert_eq!(jobs[0].metadata[0], "M-1");
        assert_eq!(jobs[0].metadata[12], "Oceania");
        assert!(Arc::ptr_eq(&jobs[0].metadata, &jobs[1].metadata));
        assert_eq!(jobs[2].metadata[9], "");
    }

    #[test]
    fn job_paths_use_stem_and_jpg() {
        let job = Job {
            image: "M-1b.JPG".to_string(),
            metadata: Arc::from(Vec::new()),
        };
        assert_eq!(job.stem(), "M-1b");
        assert_eq!(job.photo_path(Path::new("/photos")), PathBuf::from("/photos/M-1b.jpg"));
    }

    #[test]
    fn latin1_rows_are_decoded_not_fatal() {
        let mut catalog = CATALOG.lines().take(2).collect::<Vec<_>>().join("\n").into_bytes();
        catalog.extend_from_slice(b"\nM-4;Bivalvia;;;;;;;;;S\xFCdafrika;;Afrika;x;M-4.jpg\n");
        let jobs = parse_jobs(catalog.as_slice()).unwrap();
        let images: Vec<&str> = jobs.iter().map(|job| job.image.as_str()).collect();
        assert_eq!(images, vec!["M-1a.jpg", "M-1b.JPG", "M-4.jpg"]);
        assert_eq!(jobs[2].metadata[10], "S\u{fc}dafrika");
        assert_eq!(jobs[2].metadata[12], "Afrika");
    }

    #[test]
    fn header_only_catalog_has_no_jobs() {
        assert!(parse_jobs("a;b;c\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn row_format() {
        let jobs = parse_jobs(CATALOG.as_bytes()).unwrap();
        let row = CatalogRow::new(&segment("M-1a", 2, Some(HexColor([0, 10, 255]))), &jobs[0]);
        assert_eq!(
            row.to_string(),
            "M-1a_2.png;#000aff;0.0;1.0;M-1a.jpg;M-1;Gastropoda;Conidae;Conus;textile;Conus textile;Reef;1901;Pacific;;Fiji;Melanesia;Oceania"
        );
        assert_eq!(row.to_string().split(';').count(), 18);

        let blank = CatalogRow::new(&segment("M-1a", 0, None), &jobs[0]);
        assert!(blank.to_string().starts_with("M-1a_0.png;;0.0;1.0;"));
    }

    #[test]
    fn writer_emits_header_and_rows() {
        let jobs = parse_jobs(CATALOG.as_bytes()).unwrap();
        let rows: Vec<CatalogRow> = (0..3)
            .map(|i| CatalogRow::new(&segment("M-3", i, Some(HexColor([1, 2, 3]))), &jobs[2]))
            .collect();

        let mut writer = CatalogWriter::new(Vec::new()).unwrap();
        writer.append(&rows).unwrap();
        writer.append(&[]).unwrap();
        assert_eq!(writer.rows_written(), 3);

        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], OUTPUT_HEADER);
        for (i, line) in lines[1..].iter().enumerate() {
            assert!(line.starts_with(&format!("M-3_{i}.png;#010203;")));
            assert!(line.ends_with(";M-3;Bivalvia;Ostreidae;Ostrea;edulis;Ostrea edulis;Bay;1920;;;France;;Europe"));
        }
    }
}
