use egui::{Align2, Color32, Id, LayerId, Order};

use crate::error::ParseError;

/// File extensions accepted by the upload overlay
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["json", "geojson"];

/// A dropped file whose contents have been read
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// What became of one dropped file
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Read(DroppedUpload),
    Rejected { name: String, error: ParseError },
}

/// Collects files dropped onto the window.
#[derive(Debug, Default)]
pub struct FileHandler {
    dropped_files: Vec<egui::DroppedFile>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick up newly dropped files from the UI context.
    /// Returns true if there are files to process.
    pub fn check_for_dropped_files(&mut self, ctx: &egui::Context) -> bool {
        ctx.input(|i| {
            if !i.raw.dropped_files.is_empty() {
                self.dropped_files = i.raw.dropped_files.clone();
            }
        });
        !self.dropped_files.is_empty()
    }

    /// Read every collected file, leaving the handler empty
    pub fn take_dropped_files(&mut self) -> Vec<DropOutcome> {
        std::mem::take(&mut self.dropped_files)
            .iter()
            .map(read_dropped_file)
            .collect()
    }

    /// Shade the window while files are dragged over it
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        if ctx.input(|i| i.raw.hovered_files.is_empty()) {
            return;
        }

        let text = ctx.input(|i| {
            let mut text = "Dropping files:\n".to_owned();
            for file in &i.raw.hovered_files {
                if let Some(path) = &file.path {
                    text += &format!("\n{}", path.display());
                } else if !file.mime.is_empty() {
                    text += &format!("\n{}", file.mime);
                } else {
                    text += "\n???";
                }
            }
            text
        });

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            text,
            egui::TextStyle::Heading.resolve(&ctx.style()),
            Color32::WHITE,
        );
    }
}

/// Files of one drop, split into the single upload to parse and the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DropSelection {
    pub upload: Option<DroppedUpload>,
    pub rejected: Vec<(String, ParseError)>,
}

/// Accept only the first readable file of a drop.
///
/// Further readable files are rejected with [`ParseError::OneFileAtATime`],
/// as is every file while `busy` (a parse is still running).
pub fn select_upload(outcomes: Vec<DropOutcome>, busy: bool) -> DropSelection {
    let mut selection = DropSelection::default();
    for outcome in outcomes {
        match outcome {
            DropOutcome::Read(upload) if !busy && selection.upload.is_none() => {
                selection.upload = Some(upload);
            }
            DropOutcome::Read(upload) => {
                log::warn!("Rejecting {}: only one file is uploaded at a time", upload.name);
                selection.rejected.push((upload.name, ParseError::OneFileAtATime));
            }
            DropOutcome::Rejected { name, error } => selection.rejected.push((name, error)),
        }
    }
    selection
}

fn file_name(file: &egui::DroppedFile) -> String {
    if !file.name.is_empty() {
        file.name.clone()
    } else if let Some(name) = file.path.as_ref().and_then(|p| p.file_name()) {
        name.to_string_lossy().into_owned()
    } else {
        "unknown".to_owned()
    }
}

/// Whether the file name carries one of [`SUPPORTED_EXTENSIONS`]
pub fn is_supported_file(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, ext)| {
        SUPPORTED_EXTENSIONS
            .iter()
            .any(|supported| ext.eq_ignore_ascii_case(supported))
    })
}

fn read_dropped_file(file: &egui::DroppedFile) -> DropOutcome {
    let name = file_name(file);
    if !is_supported_file(&name) {
        log::warn!("Dropped file is not a supported type: {}", name);
        return DropOutcome::Rejected {
            name,
            error: ParseError::UnsupportedFile,
        };
    }

    // Web builds hand over the contents directly.
    if let Some(bytes) = &file.bytes {
        return DropOutcome::Read(DroppedUpload {
            name,
            bytes: bytes.to_vec(),
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    if let Some(path) = &file.path {
        return match std::fs::read(path) {
            Ok(bytes) => DropOutcome::Read(DroppedUpload { name, bytes }),
            Err(err) => {
                log::error!("Failed to read dropped file {}: {}", path.display(), err);
                DropOutcome::Rejected {
                    name,
                    error: ParseError::Unreadable(err.to_string()),
                }
            }
        };
    }

    log::warn!("Dropped file has no accessible data: {}", name);
    DropOutcome::Rejected {
        name,
        error: ParseError::Unreadable("contents are not accessible".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_file("parcels.json"));
        assert!(is_supported_file("PARCELS.GeoJSON"));
        assert!(!is_supported_file("parcels.csv"));
        assert!(!is_supported_file("json"));
    }

    #[test]
    fn test_dropped_bytes_are_read() {
        let file = egui::DroppedFile {
            name: "roads.json".to_owned(),
            bytes: Some(std::sync::Arc::from(&b"{}"[..])),
            ..Default::default()
        };
        assert_eq!(
            read_dropped_file(&file),
            DropOutcome::Read(DroppedUpload {
                name: "roads.json".to_owned(),
                bytes: b"{}".to_vec(),
            })
        );
    }

    fn read(name: &str) -> DropOutcome {
        DropOutcome::Read(DroppedUpload {
            name: name.to_owned(),
            bytes: b"{}".to_vec(),
        })
    }

    #[test]
    fn test_only_first_file_of_a_drop_is_uploaded() {
        let outcomes = vec![
            DropOutcome::Rejected {
                name: "notes.txt".to_owned(),
                error: ParseError::UnsupportedFile,
            },
            read("a.json"),
            read("b.json"),
        ];

        let selection = select_upload(outcomes, false);

        assert_eq!(selection.upload.map(|u| u.name).as_deref(), Some("a.json"));
        assert_eq!(
            selection.rejected,
            vec![
                ("notes.txt".to_owned(), ParseError::UnsupportedFile),
                ("b.json".to_owned(), ParseError::OneFileAtATime),
            ]
        );
    }

    #[test]
    fn test_drop_while_parsing_is_rejected() {
        let selection = select_upload(vec![read("late.json")], true);
        assert!(selection.upload.is_none());
        assert_eq!(
            selection.rejected,
            vec![("late.json".to_owned(), ParseError::OneFileAtATime)]
        );
    }

    #[test]
    fn test_unsupported_file_is_rejected() {
        let file = egui::DroppedFile {
            name: "photo.png".to_owned(),
            ..Default::default()
        };
        assert!(matches!(read_dropped_file(&file), DropOutcome::Rejected { .. }));
    }
}
