//! `file/copy`: mirror matched files into a destination directory

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::TaskError;
use crate::function::{Function, TaskContext};
use crate::incremental::{
    structural, FileDependency, FixedSources, GlobSources, PathInfo, SharedDependency, Sources, Targets,
};

fn default_pattern() -> String {
    "**/*".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CopyConfig {
    pub from: PathBuf,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    pub to: PathBuf,
}

impl CopyConfig {
    fn sources(&self) -> Result<GlobSources, TaskError> {
        Ok(GlobSources::new(&self.from, &self.pattern)?)
    }

    /// Where a discovered source file lands
    fn destination(&self, source: &PathInfo) -> PathBuf {
        match source.path.strip_prefix(&self.from) {
            Ok(relative) => self.to.join(relative),
            Err(_) => self.to.join(source.path.file_name().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Default)]
pub struct CopyFunction {
    canceled: AtomicBool,
}

impl CopyFunction {
    pub const NAME: &'static str = "file/copy";

    fn check_canceled(&self) -> Result<(), TaskError> {
        if self.canceled.load(Ordering::SeqCst) {
            Err(TaskError::Canceled)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Function for CopyFunction {
    type Config = CopyConfig;

    fn dependency(&self, config: &CopyConfig) -> Result<Option<SharedDependency>, TaskError> {
        let sources = config.sources()?;
        let dependency = structural(&sources, |file| vec![config.destination(file)])?;
        Ok(Some(dependency))
    }

    async fn run(&self, config: &CopyConfig, ctx: &TaskContext) -> Result<(), TaskError> {
        let sources = config.sources()?;
        let files: Vec<PathInfo> = sources.regular_files().collect();
        for file in files {
            self.check_canceled()?;
            let destination = config.destination(&file);
            let fresh = FileDependency::new(
                Arc::new(FixedSources::new([file.path.clone()])),
                Targets::new([destination.clone()]),
            );
            ctx.effect("Copy", destination.display().to_string())
                .when(Arc::new(fresh))
                .run(|| copy_file(&file.path, &destination))
                .await?;
        }
        Ok(())
    }

    async fn clean(&self, config: &CopyConfig, ctx: &TaskContext) -> Result<(), TaskError> {
        let sources = config.sources()?;
        let copied: Vec<PathBuf> = sources
            .regular_files()
            .map(|file| config.destination(&file))
            .filter(|destination| destination.exists())
            .collect();
        for destination in copied {
            self.check_canceled()?;
            ctx.effect("Remove", destination.display().to_string())
                .run(|| async move {
                    tokio::fs::remove_file(&destination).await?;
                    Ok::<_, TaskError>(())
                })
                .await?;
        }
        Ok(())
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }
}

async fn copy_file(from: &Path, to: &Path) -> Result<(), TaskError> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(from, to).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incremental::DependencyError;
    use crate::process::RecordingExecutor;
    use crate::reporter::{CollectingReporter, TaskEvent};
    use gantry_core::TargetInstanceId;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_at(path: &Path, secs: u64) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs))
            .unwrap();
    }

    fn setup() -> (TempDir, CopyConfig) {
        let temp = TempDir::new().unwrap();
        write_at(&temp.path().join("src/a.txt"), 0);
        write_at(&temp.path().join("src/nested/b.txt"), 0);
        write_at(&temp.path().join("src/skip.log"), 0);
        let config = CopyConfig {
            from: temp.path().join("src"),
            pattern: "**/*.txt".to_string(),
            to: temp.path().join("dist"),
        };
        (temp, config)
    }

    fn context() -> (TaskContext, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::default());
        let ctx = TaskContext::new(
            TargetInstanceId::new("copy"),
            Arc::new(RecordingExecutor::new()),
            reporter.clone(),
        );
        (ctx, reporter)
    }

    #[tokio::test]
    async fn test_copies_matching_files() {
        let (temp, config) = setup();
        let (ctx, _) = context();

        CopyFunction::default().run(&config, &ctx).await.unwrap();

        let dist = temp.path().join("dist");
        assert!(dist.join("a.txt").is_file());
        assert!(dist.join("nested/b.txt").is_file());
        assert!(!dist.join("skip.log").exists());
        assert_eq!(ctx.effect_counts().executed, 2);
    }

    #[tokio::test]
    async fn test_second_run_is_up_to_date() {
        let (_temp, config) = setup();
        let function = CopyFunction::default();
        let (first, _) = context();
        function.run(&config, &first).await.unwrap();

        assert!(!function.dependency(&config).unwrap().unwrap().requires_rebuild());

        let (second, reporter) = context();
        function.run(&config, &second).await.unwrap();
        assert_eq!(second.effect_counts().skipped, 2);
        assert!(reporter
            .events()
            .iter()
            .all(|e| matches!(e, TaskEvent::EffectSkipped { .. })));
    }

    #[tokio::test]
    async fn test_only_touched_file_is_copied_again() {
        let (temp, config) = setup();
        let function = CopyFunction::default();
        let (first, _) = context();
        function.run(&config, &first).await.unwrap();

        std::fs::write(temp.path().join("src/a.txt"), "changed").unwrap();
        assert!(function.dependency(&config).unwrap().unwrap().requires_rebuild());

        let (second, _) = context();
        function.run(&config, &second).await.unwrap();
        assert_eq!(second.effect_counts().executed, 1);
        assert_eq!(second.effect_counts().skipped, 1);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("dist/a.txt")).unwrap(),
            "changed"
        );
    }

    #[tokio::test]
    async fn test_clean_removes_copies_and_is_idempotent() {
        let (temp, config) = setup();
        let function = CopyFunction::default();
        let (ctx, _) = context();
        function.run(&config, &ctx).await.unwrap();

        function.clean(&config, &ctx).await.unwrap();
        assert!(!temp.path().join("dist/a.txt").exists());
        assert!(!temp.path().join("dist/nested/b.txt").exists());
        assert!(temp.path().join("src/a.txt").exists());

        let (again, _) = context();
        function.clean(&config, &again).await.unwrap();
        assert_eq!(again.effect_counts().executed, 0);
    }

    #[test]
    fn test_empty_source_set_is_an_error() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        let config = CopyConfig {
            from: temp.path().join("src"),
            pattern: default_pattern(),
            to: temp.path().join("dist"),
        };

        let err = CopyFunction::default().dependency(&config).unwrap_err();
        assert!(matches!(err, TaskError::Dependency(DependencyError::NoRegularFiles { .. })));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let (_temp, config) = setup();
        let function = CopyFunction::default();
        function.cancel();
        let (ctx, _) = context();

        assert!(matches!(function.run(&config, &ctx).await, Err(TaskError::Canceled)));
    }
}
