use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::domain::SequenceId;

const MODELS_DIR: &str = "models";
const REPORTS_DIR: &str = "reports";
const MAX_REPORT_SUFFIX: u32 = 1000;

/// Fixed-name files of a run directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    InputFasta,
    AugustusGff,
    PredictedGenes,
    ProteinSequences,
    DeepGoPlusTsv,
    Annotations,
}

impl ArtifactKind {
    pub const ALL: [Self; 6] = [
        Self::InputFasta,
        Self::AugustusGff,
        Self::PredictedGenes,
        Self::ProteinSequences,
        Self::DeepGoPlusTsv,
        Self::Annotations,
    ];

    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::InputFasta => "input.fasta",
            Self::AugustusGff => "augustus.gff",
            Self::PredictedGenes => "predicted_genes.fasta",
            Self::ProteinSequences => "protein_sequences.fasta",
            Self::DeepGoPlusTsv => "deepgoplus.tsv",
            Self::Annotations => "final_annotations.csv",
        }
    }

    /// Everything except the uploaded input is produced by the pipeline.
    #[must_use]
    pub const fn is_derived(self) -> bool {
        !matches!(self, Self::InputFasta)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Replace every non-alphanumeric character so a record id can be used as
/// a file stem.
#[must_use]
pub fn safe_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Run directories under a common root, one per sequence.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn run_dir(&self, run: SequenceId) -> PathBuf {
        self.root.join(run.to_string())
    }

    #[must_use]
    pub fn path(&self, run: SequenceId, kind: ArtifactKind) -> PathBuf {
        self.run_dir(run).join(kind.file_name())
    }

    #[must_use]
    pub fn models_dir(&self, run: SequenceId) -> PathBuf {
        self.run_dir(run).join(MODELS_DIR)
    }

    #[must_use]
    pub fn model_path(&self, run: SequenceId, protein_id: &str) -> PathBuf {
        self.models_dir(run).join(format!("{}.pdb", safe_id(protein_id)))
    }

    #[must_use]
    pub fn reports_dir(&self, run: SequenceId) -> PathBuf {
        self.run_dir(run).join(REPORTS_DIR)
    }

    /// Create the run directory, drop any stale copy of the artifact and
    /// return the path a tool should write it to.
    pub async fn prepare(&self, run: SequenceId, kind: ArtifactKind) -> io::Result<PathBuf> {
        fs::create_dir_all(self.run_dir(run)).await?;
        let path = self.path(run, kind);
        remove_file_if_exists(&path).await?;
        Ok(path)
    }

    pub async fn write(&self, run: SequenceId, kind: ArtifactKind, contents: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(self.run_dir(run)).await?;
        let path = self.path(run, kind);
        fs::write(&path, contents).await?;
        debug!(run = run.value(), artifact = %kind, "Wrote artifact");
        Ok(path)
    }

    /// `None` when the artifact was never written.
    pub async fn read(&self, run: SequenceId, kind: ArtifactKind) -> io::Result<Option<String>> {
        read_optional(&self.path(run, kind)).await
    }

    pub async fn is_present(&self, run: SequenceId, kind: ArtifactKind) -> bool {
        fs::metadata(self.path(run, kind))
            .await
            .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
    }

    /// Drop every model file of a run.
    pub async fn clear_models(&self, run: SequenceId) -> io::Result<()> {
        remove_dir_if_exists(&self.models_dir(run)).await
    }

    pub async fn write_model(&self, run: SequenceId, protein_id: &str, pdb: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(self.models_dir(run)).await?;
        let path = self.model_path(run, protein_id);
        fs::write(&path, pdb).await?;
        Ok(path)
    }

    pub async fn copy_model(&self, run: SequenceId, protein_id: &str, source: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(self.models_dir(run)).await?;
        let path = self.model_path(run, protein_id);
        fs::copy(source, &path).await?;
        Ok(path)
    }

    /// Model files of a run, sorted by name.
    pub async fn list_models(&self, run: SequenceId) -> io::Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(self.models_dir(run)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut models = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "pdb") {
                models.push(path);
            }
        }
        models.sort();
        Ok(models)
    }

    /// Create an empty report file under an unused name and return its path.
    /// A taken name is numbered `name_2.ext`, `name_3.ext` and so on, so an
    /// existing report is never overwritten.
    pub async fn reserve_report(&self, run: SequenceId, file_name: &str) -> io::Result<PathBuf> {
        let dir = self.reports_dir(run);
        fs::create_dir_all(&dir).await?;

        let name = Path::new(file_name);
        let stem = name.file_stem().and_then(|s| s.to_str()).unwrap_or("report");
        let extension = name.extension().and_then(|e| e.to_str());

        for n in 1..=MAX_REPORT_SUFFIX {
            let candidate = match (n, extension) {
                (1, _) => file_name.to_string(),
                (_, Some(ext)) => format!("{stem}_{n}.{ext}"),
                (_, None) => format!("{stem}_{n}"),
            };
            let path = dir.join(candidate);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("No free report name for {file_name}"),
        ))
    }

    pub async fn write_report(&self, run: SequenceId, file_name: &str, contents: &str) -> io::Result<PathBuf> {
        let dir = self.reports_dir(run);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(file_name);
        fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Remove everything the pipeline produced for a run, keeping the
    /// uploaded input.
    pub async fn purge_derived(&self, run: SequenceId) -> io::Result<()> {
        for kind in ArtifactKind::ALL.into_iter().filter(|k| k.is_derived()) {
            remove_file_if_exists(&self.path(run, kind)).await?;
        }
        remove_dir_if_exists(&self.models_dir(run)).await?;
        remove_dir_if_exists(&self.reports_dir(run)).await?;
        Ok(())
    }

    pub async fn purge_all(&self, run: SequenceId) -> io::Result<()> {
        remove_dir_if_exists(&self.run_dir(run)).await
    }
}

pub async fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

async fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> ArtifactStore {
        ArtifactStore::new(std::env::temp_dir().join(format!("genevision-artifacts-{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_safe_id() {
        assert_eq!(safe_id("gene1"), "gene1");
        assert_eq!(safe_id("sp|P12345|x.1"), "sp_P12345_x_1");
    }

    #[test]
    fn test_runs_do_not_share_paths() {
        let store = ArtifactStore::new("/data/runs");
        assert_eq!(
            store.path(SequenceId::new(4), ArtifactKind::Annotations),
            PathBuf::from("/data/runs/4/final_annotations.csv")
        );
        assert_ne!(
            store.path(SequenceId::new(4), ArtifactKind::InputFasta),
            store.path(SequenceId::new(5), ArtifactKind::InputFasta)
        );
        assert_eq!(
            store.model_path(SequenceId::new(4), "gene 1"),
            PathBuf::from("/data/runs/4/models/gene_1.pdb")
        );
    }

    #[tokio::test]
    async fn test_purge_derived_keeps_input() {
        let store = temp_store();
        let run = SequenceId::new(1);

        store.write(run, ArtifactKind::InputFasta, ">input_sequence\nACGT\n").await.unwrap();
        store.write(run, ArtifactKind::AugustusGff, "# gff\n").await.unwrap();
        store.write_model(run, "gene1", "ATOM\n").await.unwrap();
        store.write_report(run, "r.html", "<html></html>").await.unwrap();
        assert!(store.is_present(run, ArtifactKind::AugustusGff).await);

        store.purge_derived(run).await.unwrap();

        assert!(store.is_present(run, ArtifactKind::InputFasta).await);
        assert!(!store.is_present(run, ArtifactKind::AugustusGff).await);
        assert!(store.list_models(run).await.unwrap().is_empty());
        assert!(store.read(run, ArtifactKind::DeepGoPlusTsv).await.unwrap().is_none());

        store.purge_all(run).await.unwrap();
        assert!(!store.run_dir(run).exists());
        fs::remove_dir_all(store.root()).await.ok();
    }

    #[tokio::test]
    async fn test_reserved_report_names_never_collide() {
        let store = temp_store();
        let run = SequenceId::new(3);

        let first = store.reserve_report(run, "report_1.html").await.unwrap();
        store.write_report(run, "report_1.html", "first").await.unwrap();
        let second = store.reserve_report(run, "report_1.html").await.unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("reports/report_1_2.html"));
        assert_eq!(fs::read_to_string(&first).await.unwrap(), "first");

        fs::remove_dir_all(store.root()).await.ok();
    }
}
