use anyhow::Result;
use console::{Term, style};
use log::{info, warn};
use video_frame_pipeline::config::PipelineSettings;
use video_frame_pipeline::init;
use video_frame_pipeline::menu::show_main_menu;
use video_frame_pipeline::signal::setup_shutdown_signal;

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal()?;
    let mut settings = PipelineSettings::load()?;

    loop {
        match show_main_menu(&term, &shutdown_signal, &mut settings) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style("再見！").green().bold());
                info!("程式正常結束");
                break;
            }
            Err(e) => {
                warn!("程式錯誤: {e}");
                eprintln!("{} {}", style("錯誤:").red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
