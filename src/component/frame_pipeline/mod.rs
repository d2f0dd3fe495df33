//! 影格管線元件
//!
//! 將影片拆成影格、交給逐影格轉換階段處理、再合併回影片並還原音訊。
//! 工作區以檔名主幹定位，可跨執行沿用已擷取的影格。

mod audio_reattacher;
mod encoding_profile;
mod frame_extractor;
mod frame_merger;
mod frame_processor;
mod frame_range;
mod image_finalizer;
mod main;
mod process_supervisor;
mod run_context;

pub use audio_reattacher::{AudioReattacher, build_replace_audio_args, build_restore_audio_args};
pub use encoding_profile::{EncoderFamily, EncodingProfile, amf_preset, nvenc_preset};
pub use frame_extractor::{ExtractOutcome, FrameExtractor, build_extract_args, build_video_filter};
pub use frame_merger::{FrameMerger, MergeInput, build_merge_args, write_concat_manifest};
pub use frame_processor::{FrameProcessor, PassthroughProcessor};
pub use frame_range::{
    FrameRange, FrameRangeRecord, FrameSequence, GapPolicy, needs_explicit_range,
    read_frame_range_record, remove_frame_range_record, resolve_frame_list, resolve_sequence,
    should_reuse_cache, write_frame_range_record,
};
pub use image_finalizer::{ImageFinalizer, image_compression};
pub use main::{FramePipeline, PipelineStage, PipelineStatus};
pub use process_supervisor::{DEFAULT_POLL_INTERVAL, ProcessState, ProcessSupervisor, RunMode};
pub use run_context::RunContext;
