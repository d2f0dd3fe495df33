use crate::config::{OutputVideoEncoder, OutputVideoPreset, PipelineSettings, save_settings};
use crate::menu::handlers::{run_clear_workspace, run_frame_pipeline, show_current_settings};
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Select};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    settings: &mut PipelineSettings,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style("=== 影格管線 ===").cyan().bold());
    println!("{}", style("按 ESC 離開").dim());

    let options = vec![
        "處理媒體檔案",
        "清除工作區",
        "編碼設定",
        "顯示目前設定",
        "離開",
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("請選擇功能")
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_frame_pipeline(term, shutdown_signal, settings)?;
            Ok(true)
        }
        Some(1) => {
            run_clear_workspace(term, settings)?;
            Ok(true)
        }
        Some(2) => {
            show_settings_menu(term, settings)?;
            Ok(true)
        }
        Some(3) => {
            show_current_settings(term, settings)?;
            Ok(true)
        }
        Some(4) | None => Ok(false),
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, settings: &mut PipelineSettings) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style("=== 編碼設定 ===").cyan().bold());
        println!("{}", style("按 ESC 返回").dim());

        let options = vec!["輸出編碼器", "編碼預設", "影片品質", "處理選項", "返回"];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇設定項目")
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        let changed = match selection {
            Some(0) => select_encoder(term, settings)?,
            Some(1) => select_preset(term, settings)?,
            Some(2) => input_video_quality(settings)?,
            Some(3) => toggle_flags(term, settings)?,
            Some(4) | None => break,
            _ => unreachable!(),
        };

        if changed {
            settings.validate()?;
            save_settings(settings)?;
            println!("\n{}", style("設定已儲存").green());
            std::thread::sleep(Duration::from_secs(1));
        }
    }

    Ok(())
}

fn select_encoder(term: &Term, settings: &mut PipelineSettings) -> Result<bool> {
    let encoders = OutputVideoEncoder::all();
    let items: Vec<&str> = encoders.iter().map(|e| e.as_str()).collect();
    let default_index = encoders
        .iter()
        .position(|&e| e == settings.output_video_encoder)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("目前: {}", settings.output_video_encoder))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(false);
    };
    let selected = encoders[selection];
    let changed = selected != settings.output_video_encoder;
    settings.output_video_encoder = selected;
    Ok(changed)
}

fn select_preset(term: &Term, settings: &mut PipelineSettings) -> Result<bool> {
    let presets = OutputVideoPreset::all();
    let items: Vec<&str> = presets.iter().map(|p| p.as_str()).collect();
    let default_index = presets
        .iter()
        .position(|&p| p == settings.output_video_preset)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("目前: {}", settings.output_video_preset))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(false);
    };
    let selected = presets[selection];
    let changed = selected != settings.output_video_preset;
    settings.output_video_preset = selected;
    Ok(changed)
}

fn input_video_quality(settings: &mut PipelineSettings) -> Result<bool> {
    let quality: u8 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("影片品質 (0-100)")
        .default(settings.output_video_quality)
        .validate_with(|value: &u8| {
            if *value <= 100 {
                Ok(())
            } else {
                Err("品質必須介於 0 到 100")
            }
        })
        .interact_text()?;

    let changed = quality != settings.output_video_quality;
    settings.output_video_quality = quality;
    Ok(changed)
}

fn toggle_flags(term: &Term, settings: &mut PipelineSettings) -> Result<bool> {
    let items = [
        "沿用既有影格（跳過擷取）",
        "保留工作區",
        "兩段式目錄（輸出至 out）",
        "略過音訊",
        "CUDA 硬體加速",
        "缺少影格時中止",
    ];
    let current = [
        settings.skip_extract_frames,
        settings.keep_temp,
        settings.out_new_dir,
        settings.skip_audio,
        settings.hwaccel_cuda,
        settings.strict_frames,
    ];

    let selection = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("空白鍵切換，Enter 確認")
        .items(&items)
        .defaults(&current)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(false);
    };
    let mut flags = [false; 6];
    for index in selection {
        flags[index] = true;
    }
    if flags == current {
        return Ok(false);
    }

    settings.skip_extract_frames = flags[0];
    settings.keep_temp = flags[1];
    settings.out_new_dir = flags[2];
    settings.skip_audio = flags[3];
    settings.hwaccel_cuda = flags[4];
    settings.strict_frames = flags[5];
    Ok(true)
}
