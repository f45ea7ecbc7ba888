use tracing::{debug, info, warn};

// Sequential image upload queue. The transport is supplied by the
// caller; this module only validates, orders, reports progress and
// aggregates outcomes. One failed item never aborts the batch.

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { name: String, url: String },
    Rejected { name: String, reason: String },
    Failed { name: String, reason: String },
}

#[derive(Debug, Default)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn urls(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                UploadOutcome::Uploaded { url, .. } => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o, UploadOutcome::Uploaded { .. }))
            .count()
    }
}

/// Client-side validation rules, checked before any transfer starts.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_extensions: Vec<String>,
    pub max_size_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            allowed_extensions: ["jpg", "jpeg", "png", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_size_bytes: 10 * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    fn validate(&self, file: &UploadFile) -> Result<(), String> {
        let extension = file
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        if !self.allowed_extensions.contains(&extension) {
            return Err(format!("unsupported file type .{extension}"));
        }
        if file.size_bytes > self.max_size_bytes {
            return Err(format!(
                "file is {} bytes, limit is {}",
                file.size_bytes, self.max_size_bytes
            ));
        }
        Ok(())
    }
}

/// Upload files one after another, reporting the completed percentage
/// after each item and continuing past individual failures.
pub fn upload_all<T, P>(
    files: &[UploadFile],
    policy: &UploadPolicy,
    mut transfer: T,
    mut progress: P,
) -> UploadReport
where
    T: FnMut(&UploadFile) -> Result<String, String>,
    P: FnMut(u8),
{
    let mut report = UploadReport::default();
    let total = files.len();
    for (idx, file) in files.iter().enumerate() {
        let outcome = match policy.validate(file) {
            Err(reason) => {
                warn!("Rejected {}: {}", file.name, reason);
                UploadOutcome::Rejected {
                    name: file.name.clone(),
                    reason,
                }
            }
            Ok(()) => match transfer(file) {
                Ok(url) => {
                    debug!("Uploaded {} -> {}", file.name, url);
                    UploadOutcome::Uploaded {
                        name: file.name.clone(),
                        url,
                    }
                }
                Err(reason) => {
                    warn!("Upload of {} failed: {}", file.name, reason);
                    UploadOutcome::Failed {
                        name: file.name.clone(),
                        reason,
                    }
                }
            },
        };
        report.outcomes.push(outcome);
        progress(((idx + 1) * 100 / total) as u8);
    }
    info!(
        "Uploaded {}/{} files",
        total - report.failure_count(),
        total
    );
    report
}
