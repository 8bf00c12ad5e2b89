//! Streaming reader for archive-description (DAT) documents.
//!
//! One forward pass over the XML emits, strictly top-down: the [`Dataset`], then per `game` /
//! `machine` element its [`DatasetEntry`] followed by that entry's [`Candidate`]s. Parents are
//! resolved through an explicit stack of open frames; emitted rows are addressed by the index the
//! sink hands back.

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::engine::tools::{decode_hex, file_stem_of, path_to_db_string};
use crate::{Candidate, Dataset, DatasetEntry, ParsedDat};

/// Receiver of parsed rows, called in emission order.
pub trait DatSink {
    /// Returns the index later rows use to refer to this dataset.
    fn dataset(&mut self, dataset: Dataset) -> usize;
    /// Returns the index later rows use to refer to this entry.
    fn entry(&mut self, entry: DatasetEntry) -> usize;
    fn candidate(&mut self, candidate: Candidate);
}

impl DatSink for ParsedDat {
    fn dataset(&mut self, dataset: Dataset) -> usize {
        self.datasets.push(dataset);
        self.datasets.len() - 1
    }

    fn entry(&mut self, entry: DatasetEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    fn candidate(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }
}

/// Entry under construction. `emitted` is set once the sink has it.
#[derive(Debug, Default)]
struct EntryBuilder {
    name: String,
    description: Option<String>,
    emitted: Option<usize>,
}

#[derive(Debug)]
enum Frame {
    /// The document root element (`datafile`).
    Document,
    Header,
    Entry(EntryBuilder),
    /// A text-carrying child of `header` or of an entry.
    Text { tag: String, text: String },
    /// Anything the reader does not interpret; kept so end tags stay balanced.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
    Document,
    Header,
    Entry,
    Other,
}

impl Frame {
    fn kind(&self) -> FrameKind {
        match self {
            Frame::Document => FrameKind::Document,
            Frame::Header => FrameKind::Header,
            Frame::Entry(_) => FrameKind::Entry,
            Frame::Text { .. } | Frame::Ignored => FrameKind::Other,
        }
    }
}

const HEADER_TEXT_TAGS: &[&str] = &[
    "name",
    "description",
    "category",
    "version",
    "author",
    "email",
    "homepage",
    "url",
];

struct DatParser<'s, S: DatSink> {
    sink: &'s mut S,
    stack: Vec<Frame>,
    header: Dataset,
    dataset: Option<usize>,
}

impl<'s, S: DatSink> DatParser<'s, S> {
    fn new(sink: &'s mut S, filepath: &str) -> Self {
        let header = Dataset {
            filepath: filepath.to_string(),
            name: file_stem_of(Path::new(filepath)),
            ..Dataset::default()
        };
        Self {
            sink,
            stack: Vec::new(),
            header,
            dataset: None,
        }
    }

    /// Emit the dataset once; everything below the root depends on it.
    fn ensure_dataset(&mut self) -> usize {
        match self.dataset {
            Some(index) => index,
            None => {
                let index = self.sink.dataset(self.header.clone());
                self.dataset = Some(index);
                index
            }
        }
    }

    fn emit_entry(&mut self, builder: &mut EntryBuilder) -> usize {
        if let Some(index) = builder.emitted {
            return index;
        }
        let dataset = self.ensure_dataset();
        let index = self.sink.entry(DatasetEntry {
            dataset,
            name: builder.name.clone(),
            description: builder.description.clone().unwrap_or_default(),
        });
        builder.emitted = Some(index);
        index
    }

    fn open(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        let parent = self.stack.last().map(Frame::kind);
        let frame = match parent {
            None => Frame::Document,
            Some(FrameKind::Document) if tag == "header" => Frame::Header,
            Some(FrameKind::Document) if tag == "game" || tag == "machine" => {
                self.ensure_dataset();
                let name = attribute(element, "name")?.unwrap_or_default();
                Frame::Entry(EntryBuilder {
                    name,
                    ..EntryBuilder::default()
                })
            }
            Some(FrameKind::Entry) if tag == "rom" => {
                self.rom(element)?;
                Frame::Ignored
            }
            Some(FrameKind::Entry) if tag == "description" => Frame::Text {
                tag,
                text: String::new(),
            },
            Some(FrameKind::Header) if HEADER_TEXT_TAGS.contains(&tag.as_str()) => Frame::Text {
                tag,
                text: String::new(),
            },
            _ => Frame::Ignored,
        };
        self.stack.push(frame);
        Ok(())
    }

    fn rom(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let Some(Frame::Entry(mut builder)) = self.stack.pop() else {
            bail!("rom element outside of an entry");
        };
        let entry = self.emit_entry(&mut builder);
        self.stack.push(Frame::Entry(builder));

        let hashes = (
            attribute(element, "sha1")?.as_deref().and_then(decode_hex),
            attribute(element, "md5")?.as_deref().and_then(decode_hex),
            attribute(element, "crc")?.as_deref().and_then(decode_hex),
        );
        // Candidates without the full hash triple are dropped.
        let (Some(sha1), Some(md5), Some(crc32)) = hashes else {
            return Ok(());
        };
        let size = attribute(element, "size")?
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(0);
        self.sink.candidate(Candidate {
            entry,
            name: attribute(element, "name")?.unwrap_or_default(),
            size,
            sha1,
            md5,
            crc32,
        });
        Ok(())
    }

    fn text(&mut self, value: &str) {
        if let Some(Frame::Text { text, .. }) = self.stack.last_mut() {
            text.push_str(value);
        }
    }

    fn close(&mut self) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            bail!("unbalanced end tag");
        };
        match frame {
            Frame::Text { tag, text } => {
                let value = (!text.is_empty()).then_some(text);
                match self.stack.pop() {
                    Some(Frame::Header) => {
                        self.set_header_field(&tag, value);
                        self.stack.push(Frame::Header);
                    }
                    Some(Frame::Entry(mut builder)) => {
                        builder.description = Some(value.unwrap_or_default());
                        self.emit_entry(&mut builder);
                        self.stack.push(Frame::Entry(builder));
                    }
                    Some(other) => self.stack.push(other),
                    None => {}
                }
            }
            Frame::Entry(mut builder) => {
                self.emit_entry(&mut builder);
            }
            Frame::Header | Frame::Document => {
                self.ensure_dataset();
            }
            Frame::Ignored => {}
        }
        Ok(())
    }

    fn set_header_field(&mut self, tag: &str, value: Option<String>) {
        let Some(value) = value else {
            return;
        };
        let h = &mut self.header;
        match tag {
            "name" => h.name = value,
            "description" => h.description = Some(value),
            "category" => h.category = value,
            "version" => h.version = value,
            "author" => h.author = Some(value),
            "email" => h.email = Some(value),
            "homepage" => h.homepage = Some(value),
            "url" => h.url = Some(value),
            _ => {}
        }
    }
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.context("malformed attribute")?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr.unescape_value().context("unescape attribute value")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a DAT stream, handing rows to `sink` in emission order.
pub fn parse_dat<R: BufRead, S: DatSink>(input: R, filepath: &str, sink: &mut S) -> Result<()> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);
    let mut parser = DatParser::new(sink, filepath);
    let mut buf = Vec::new();
    let mut saw_root = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("{filepath}: XML error at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                saw_root = true;
                parser.open(&e)?;
            }
            Event::Empty(e) => {
                saw_root = true;
                parser.open(&e)?;
                parser.close()?;
            }
            Event::End(_) => parser.close()?,
            Event::Text(t) => {
                let text = t.unescape().context("unescape text")?;
                parser.text(&text);
            }
            Event::CData(c) => parser.text(&String::from_utf8_lossy(&c.into_inner())),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        bail!("{filepath}: document has no root element");
    }
    if !parser.stack.is_empty() {
        bail!("{filepath}: document ended inside an open element");
    }
    Ok(())
}

/// Read and parse one DAT file into a [`ParsedDat`] batch.
pub fn parse_dat_file(path: &Path) -> Result<ParsedDat> {
    let filepath = path_to_db_string(path);
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut parsed = ParsedDat {
        filepath: filepath.clone(),
        ..ParsedDat::default()
    };
    parse_dat(BufReader::new(file), &filepath, &mut parsed)?;
    Ok(parsed)
}
