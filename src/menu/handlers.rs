use crate::component::frame_pipeline::{FramePipeline, PipelineStatus, RunContext};
use crate::config::PipelineSettings;
use crate::pause;
use crate::signal::reset_shutdown_signal;
use crate::tools::Workspace;
use anyhow::Result;
use console::{Term, style};
use dialoguer::Input;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_frame_pipeline(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    settings: &PipelineSettings,
) -> Result<()> {
    println!("{}", style("=== 影格管線處理 ===").cyan().bold());

    let target_path = prompt_path("請輸入目標檔案路徑", None)?;
    let default_output = default_output_path(&target_path);
    let output_path = prompt_path("請輸入輸出檔案路徑", Some(&default_output))?;

    reset_shutdown_signal(shutdown_signal);
    let context = RunContext::new(settings.clone(), Arc::clone(shutdown_signal));
    let mut pipeline = FramePipeline::new(context);

    match pipeline.run(&target_path, &output_path) {
        Ok(PipelineStatus::Completed) => {
            println!(
                "{} {}",
                style("處理完成:").green().bold(),
                output_path.display()
            );
        }
        Ok(PipelineStatus::Cancelled) => {
            println!("{}", style("處理已中斷，工作區已保留").yellow());
        }
        Ok(PipelineStatus::Failed(stage)) => {
            eprintln!("{} {stage}", style("處理失敗:").red().bold());
        }
        Err(e) => eprintln!("{} {:#}", style("錯誤:").red().bold(), e),
    }

    pause(term)?;
    Ok(())
}

pub fn run_clear_workspace(term: &Term, settings: &PipelineSettings) -> Result<()> {
    println!("{}", style("=== 清除工作區 ===").cyan().bold());

    let target_path = prompt_path("請輸入目標檔案路徑", None)?;
    let workspace = Workspace::resolve(&target_path, settings.temp_dir.as_deref());

    if workspace.exists() {
        if let Err(e) = workspace.clear(false) {
            eprintln!("{} {:#}", style("錯誤:").red().bold(), e);
        } else {
            println!(
                "{} {}",
                style("已清除:").green(),
                workspace.path().display()
            );
        }
    } else {
        println!("{}", style("此目標沒有工作區").yellow());
    }

    pause(term)?;
    Ok(())
}

pub fn show_current_settings(term: &Term, settings: &PipelineSettings) -> Result<()> {
    println!("{}", style("=== 目前設定 ===").cyan().bold());
    println!("{}", serde_json::to_string_pretty(settings)?);
    pause(term)?;
    Ok(())
}

fn prompt_path(prompt: &str, default: Option<&Path>) -> Result<PathBuf> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.to_string_lossy().to_string());
    }
    let path = input.interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

/// `<目錄>/<主幹>_processed.<副檔名>`
fn default_output_path(target_path: &Path) -> PathBuf {
    let stem = target_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match target_path.extension() {
        Some(extension) => format!("{stem}_processed.{}", extension.to_string_lossy()),
        None => format!("{stem}_processed"),
    };
    target_path.with_file_name(file_name)
}
