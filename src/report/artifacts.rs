use super::playwright::ReportAttachment;
use crate::runner::context::ExecutionContext;
use crate::runner::result::Attachment;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::{Path, PathBuf};

/// Attachments with absolute paths plus the artifacts surfaced on the result
#[derive(Debug, Clone, Default)]
pub struct ResolvedArtifacts {
    pub attachments: Vec<Attachment>,
    /// `data:<type>;base64,...`
    pub screenshot: Option<String>,
    pub video_path: Option<String>,
    pub trace_path: Option<String>,
    /// Lines destined for the execution log
    pub notes: Vec<String>,
}

/// Resolve attachment paths, inline the screenshot and, for failed runs,
/// surface video and trace.
///
/// When `artifact_store` is set, video and trace are copied out of the
/// context first because the context is deleted once the run ends.
pub fn resolve(
    context: &ExecutionContext,
    attachments: &[ReportAttachment],
    failed: bool,
    artifact_store: Option<&Path>,
) -> ResolvedArtifacts {
    let mut resolved = ResolvedArtifacts::default();

    for raw in attachments {
        let path = raw
            .path
            .as_deref()
            .map(|p| resolve_path(context.artifacts_dir(), p));
        let missing = path.as_ref().map_or(false, |p| !p.is_file());
        if missing {
            resolved.notes.push(format!(
                "Attachment '{}' points to a missing file: {}",
                raw.name,
                path.as_ref().map(|p| p.display().to_string()).unwrap_or_default()
            ));
        }

        let mut attachment = Attachment {
            name: raw.name.clone(),
            content_type: raw.content_type.clone(),
            path: path.as_ref().map(|p| p.to_string_lossy().into_owned()),
            body: raw.body.clone(),
            missing,
        };

        if resolved.screenshot.is_none() && is_screenshot(&attachment) {
            resolved.screenshot = inline_image(&attachment, &mut resolved.notes);
        }

        if failed && !missing {
            if let Some(p) = &path {
                if resolved.video_path.is_none() && is_video(&attachment) {
                    let kept = keep_artifact(context, p, artifact_store, &mut resolved.notes);
                    attachment.path = Some(kept.clone());
                    resolved.video_path = Some(kept);
                } else if resolved.trace_path.is_none() && is_trace(&attachment) {
                    let kept = keep_artifact(context, p, artifact_store, &mut resolved.notes);
                    attachment.path = Some(kept.clone());
                    resolved.trace_path = Some(kept);
                }
            }
        }

        resolved.attachments.push(attachment);
    }

    resolved
}

/// Relative paths are relative to the artifacts directory
fn resolve_path(artifacts_dir: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        artifacts_dir.join(path)
    }
}

fn is_screenshot(a: &Attachment) -> bool {
    a.name == "screenshot" && a.content_type.starts_with("image/")
}

fn is_video(a: &Attachment) -> bool {
    a.name == "video" || a.content_type.starts_with("video/")
}

fn is_trace(a: &Attachment) -> bool {
    a.name == "trace"
}

fn inline_image(a: &Attachment, notes: &mut Vec<String>) -> Option<String> {
    if let Some(path) = a.path.as_deref().filter(|_| !a.missing) {
        return match std::fs::read(path) {
            Ok(bytes) if !bytes.is_empty() => Some(data_uri(&a.content_type, &STANDARD.encode(bytes))),
            Ok(_) => {
                notes.push(format!("Screenshot {} is empty, not inlined", path));
                None
            }
            Err(e) => {
                log::warn!("Failed to read screenshot {}: {}", path, e);
                notes.push(format!("Failed to read screenshot {}: {}", path, e));
                None
            }
        };
    }

    // Attachments without a file carry their bytes base64-encoded in `body`
    a.body
        .as_deref()
        .filter(|b| !b.is_empty() && a.path.is_none())
        .map(|b| data_uri(&a.content_type, b))
}

fn data_uri(content_type: &str, encoded: &str) -> String {
    format!("data:{};base64,{}", content_type, encoded)
}

/// Copy an artifact into the store, or fall back to its in-context path
fn keep_artifact(
    context: &ExecutionContext,
    path: &Path,
    artifact_store: Option<&Path>,
    notes: &mut Vec<String>,
) -> String {
    let Some(store) = artifact_store else {
        log::warn!(
            "{} will be removed with the execution context; set an artifact store to keep it",
            path.display()
        );
        return path.to_string_lossy().into_owned();
    };

    let dest_dir = store.join(context.id());
    let file_name = path.file_name().map(PathBuf::from).unwrap_or_else(|| "artifact".into());
    let dest = dest_dir.join(file_name);

    let copied = std::fs::create_dir_all(&dest_dir).and_then(|_| std::fs::copy(path, &dest));
    match copied {
        Ok(_) => {
            notes.push(format!("Kept {} as {}", path.display(), dest.display()));
            dest.to_string_lossy().into_owned()
        }
        Err(e) => {
            log::warn!("Failed to copy {} to {}: {}", path.display(), dest.display(), e);
            notes.push(format!("Failed to keep {}: {}", path.display(), e));
            path.to_string_lossy().into_owned()
        }
    }
}
