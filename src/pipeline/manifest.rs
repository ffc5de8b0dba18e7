//! The image-set manifest (`path_list.csv`).
//!
//! One image set per line:
//!
//! ```text
//! r_path,y_path,b_path,g_path,out_dir,out_name
//! ```
//!
//! Blank lines and lines whose first character is `#` are skipped. There is no
//! header row.

use crate::core::{ProcessingStage, SubCellError, SubCellResult};
use crate::processors::{Channel, ChannelSet};
use crate::utils::load_gray_channel;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// Number of comma-separated fields in a manifest line.
pub const MANIFEST_FIELDS: usize = 6;

/// One image set from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    /// 1-based line number in the manifest.
    pub line: usize,
    /// Image paths in red, yellow, blue, green column order.
    pub channel_paths: [PathBuf; 4],
    /// Directory receiving per-cell outputs.
    pub out_dir: PathBuf,
    /// Base name of per-cell outputs; also the row id in the result table.
    pub out_name: String,
}

impl ManifestRow {
    /// Parses one manifest line.
    ///
    /// # Errors
    ///
    /// Fails if the line does not have exactly six comma-separated fields.
    pub fn parse(line: usize, text: &str) -> SubCellResult<Self> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields.len() != MANIFEST_FIELDS {
            return Err(SubCellError::invalid_input(format!(
                "manifest line {} has {} fields, expected {} (r,y,b,g,out_dir,out_name)",
                line,
                fields.len(),
                MANIFEST_FIELDS
            )));
        }
        Ok(Self {
            line,
            channel_paths: [
                PathBuf::from(fields[0]),
                PathBuf::from(fields[1]),
                PathBuf::from(fields[2]),
                PathBuf::from(fields[3]),
            ],
            out_dir: PathBuf::from(fields[4]),
            out_name: fields[5].to_string(),
        })
    }

    /// Image path of a channel.
    pub fn channel_path(&self, channel: Channel) -> &Path {
        &self.channel_paths[channel.column()]
    }

    /// Path prefix for the per-cell output files.
    pub fn output_stem(&self) -> PathBuf {
        self.out_dir.join(&self.out_name)
    }

    /// Creates the output directory, including missing parents.
    pub fn ensure_out_dir(&self) -> SubCellResult<()> {
        std::fs::create_dir_all(&self.out_dir)
            .map_err(|e| SubCellError::io("create output directory", &self.out_dir, e))
    }

    /// Loads the channels of `set` as grayscale planes, in column order.
    pub fn load_channels(&self, set: &ChannelSet) -> SubCellResult<Vec<Array2<f32>>> {
        self.load_channels_with(set, load_gray_channel)
    }

    /// Like [`load_channels`](Self::load_channels) with a custom image loader.
    ///
    /// Channels outside `set` are never passed to `loader`.
    pub fn load_channels_with<F>(&self, set: &ChannelSet, mut loader: F) -> SubCellResult<Vec<Array2<f32>>>
    where
        F: FnMut(&Path) -> SubCellResult<Array2<f32>>,
    {
        set.iter()
            .map(|channel| loader(self.channel_path(channel)))
            .collect()
    }
}

/// Streams rows from a manifest, skipping blank and comment lines.
pub struct ManifestReader<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> ManifestReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl ManifestReader<BufReader<File>> {
    /// Opens a manifest file. Returns `None` if the file does not exist.
    pub fn open(path: &Path) -> SubCellResult<Option<Self>> {
        match File::open(path) {
            Ok(file) => Ok(Some(Self::new(BufReader::new(file)))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SubCellError::io("open manifest", path, e)),
        }
    }
}

impl<R: BufRead> Iterator for ManifestReader<R> {
    type Item = SubCellResult<ManifestRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => {
                    return Some(Err(SubCellError::processing_error(
                        ProcessingStage::Manifest,
                        &format!("reading line {}", self.line + 1),
                        e,
                    )));
                }
            };
            self.line += 1;
            // Only a `#` in the first column marks a comment.
            let trimmed = text.trim();
            if trimmed.is_empty() || text.starts_with('#') {
                continue;
            }
            return Some(ManifestRow::parse(self.line, trimmed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_trims_fields() {
        let row = ManifestRow::parse(1, " r.png , y.png,b.png,g.png, out/dir , cell_1 \n").unwrap();
        assert_eq!(row.channel_path(Channel::Red), Path::new("r.png"));
        assert_eq!(row.channel_path(Channel::Green), Path::new("g.png"));
        assert_eq!(row.out_dir, PathBuf::from("out/dir"));
        assert_eq!(row.out_name, "cell_1");
        assert_eq!(row.output_stem(), PathBuf::from("out/dir/cell_1"));
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!(ManifestRow::parse(3, "r.png,y.png,b.png,g.png,out").is_err());
        let err = ManifestRow::parse(4, "a,b,c,d,e,f,g").unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_reader_skips_blank_and_comment_lines() {
        let text = "# header comment\n\nr1,y1,b1,g1,out,a\n   \n#r2,y2,b2,g2,out,b\nr3,y3,b3,g3,out,c\n";
        let rows: Vec<ManifestRow> = ManifestReader::new(Cursor::new(text))
            .collect::<SubCellResult<_>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].out_name, "a");
        assert_eq!(rows[0].line, 3);
        assert_eq!(rows[1].out_name, "c");
        assert_eq!(rows[1].line, 6);
    }

    #[test]
    fn test_indented_hash_is_not_a_comment() {
        let text = "#skipped\n   # not a comment\nr,y,b,g,out,a\n";
        let mut reader = ManifestReader::new(Cursor::new(text));
        let err = reader.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
        assert_eq!(reader.next().unwrap().unwrap().out_name, "a");
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_channel_selection_reads_only_configured_paths() {
        let row = ManifestRow::parse(1, "r.png,y.png,b.png,g.png,out,cell").unwrap();
        let set: ChannelSet = "rb".parse().unwrap();
        let mut requested = Vec::new();
        let planes = row
            .load_channels_with(&set, |path| {
                requested.push(path.to_path_buf());
                Ok(Array2::zeros((2, 2)))
            })
            .unwrap();
        assert_eq!(planes.len(), 2);
        assert_eq!(requested, vec![PathBuf::from("r.png"), PathBuf::from("b.png")]);
    }

    #[test]
    fn test_unselected_channels_may_be_empty() {
        let row = ManifestRow::parse(1, "r.png,,b.png,,out,cell").unwrap();
        let set: ChannelSet = "rb".parse().unwrap();
        let planes = row
            .load_channels_with(&set, |_| Ok(Array2::zeros((1, 1))))
            .unwrap();
        assert_eq!(planes.len(), 2);
    }

    #[test]
    fn test_open_missing_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ManifestReader::open(&dir.path().join("path_list.csv")).unwrap().is_none());
    }
}
