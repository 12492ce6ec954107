// XML export import
//
// Load files carry repeated <Document> nodes. Each document names its
// external file (identifier), a label list, and typed metadata tags:
//
//   <Document DocID="0.1">
//     <Files><File><ExternalFile FileName="report.txt"/></File></Files>
//     <Tags>
//       <Tag TagName="Labels" TagDataType="Text" TagValue="Inbox, Starred"/>
//       <Tag TagName="DateModified" TagDataType="DateTime"
//            TagValue="2014-03-04T12:00:00.000+0000"/>
//     </Tags>
//   </Document>

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;

use caselink_engine::model::{Field, FieldKind, Record};
use caselink_engine::EngineError;

use crate::split_labels;

/// Lazy record stream over one XML export file.
///
/// Documents are yielded in file order. A document without an identifier
/// is a recoverable record-level error; a malformed file yields one
/// file-level error and the stream ends.
#[derive(Debug)]
pub struct XmlRecords {
    reader: Reader<BufReader<File>>,
    buf: Vec<u8>,
    path: PathBuf,
    labels_field: String,
    done: bool,
}

impl XmlRecords {
    pub fn open(path: &Path, labels_field: &str) -> Result<Self, EngineError> {
        let file = File::open(path).map_err(|e| EngineError::FileParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text(true);
        Ok(Self {
            reader,
            buf: Vec::new(),
            path: path.to_path_buf(),
            labels_field: labels_field.to_string(),
            done: false,
        })
    }

    fn file_error(&mut self, message: String) -> EngineError {
        self.done = true;
        EngineError::FileParse {
            path: self.path.display().to_string(),
            message,
        }
    }

    /// Consume events up to the matching `</Document>` and build a record.
    fn read_document(&mut self, doc_id: Option<String>) -> Result<Record, EngineError> {
        let mut file_name: Option<String> = None;
        let mut record = Record {
            identifier: String::new(),
            labels: Default::default(),
            fields: Vec::new(),
        };
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    match e.name().as_ref() {
                        b"ExternalFile" => {
                            if file_name.is_none() {
                                file_name = find_attr(e, b"FileName");
                            }
                        }
                        b"Tag" => self.push_tag(e, &mut record),
                        _ => {}
                    }
                }
                Ok(Event::End(ref e)) if e.name().as_ref() == b"Document" => break,
                Ok(Event::Eof) => {
                    return Err(self.file_error("unexpected end of document".into()));
                }
                Ok(_) => {}
                Err(e) => {
                    let position = self.reader.buffer_position();
                    return Err(self.file_error(format!("at byte {position}: {e}")));
                }
            }
        }

        let identifier = file_name.or(doc_id).unwrap_or_default();
        if identifier.is_empty() {
            return Err(EngineError::RecordParse {
                path: self.path.display().to_string(),
                message: "document has no file name or id".into(),
            });
        }
        record.identifier = identifier;
        Ok(record)
    }

    /// One <Tag> node: the labels tag feeds the label set, every other
    /// tag becomes a typed field with its raw value kept verbatim.
    fn push_tag(&self, e: &BytesStart<'_>, record: &mut Record) {
        let Some(name) = find_attr(e, b"TagName") else {
            return;
        };
        let value = find_attr(e, b"TagValue").unwrap_or_default();
        if name == self.labels_field {
            record.labels.extend(split_labels(&value, ','));
        } else {
            let declared = find_attr(e, b"TagDataType").unwrap_or_default();
            record.fields.push(Field {
                name,
                kind: FieldKind::from_declared(&declared),
                raw_value: value,
            });
        }
    }
}

impl Iterator for XmlRecords {
    type Item = Result<Record, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            enum Step {
                Document(Option<String>),
                Eof,
                Skip,
                Fail(String),
            }

            self.buf.clear();
            let step = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"Document" => {
                    Step::Document(find_attr(e, b"DocID"))
                }
                Ok(Event::Eof) => Step::Eof,
                Ok(_) => Step::Skip,
                Err(e) => {
                    let position = self.reader.buffer_position();
                    Step::Fail(format!("at byte {position}: {e}"))
                }
            };

            match step {
                Step::Document(doc_id) => return Some(self.read_document(doc_id)),
                Step::Eof => {
                    self.done = true;
                    return None;
                }
                Step::Skip => {}
                Step::Fail(message) => return Some(Err(self.file_error(message))),
            }
        }
    }
}

fn find_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| attr_text(&attr))
}

fn attr_text(attr: &Attribute<'_>) -> String {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
}
