mod ffprobe_info;
mod frame_files;
mod media_sniffer;
mod path_validator;
mod workspace;

pub use ffprobe_info::{FfprobeProbe, MediaProbe, VideoInfo, parse_resolution};
pub use frame_files::{
    frame_file_name, frame_path, frames_pattern, list_frames, parse_frame_index, remove_frames,
};
pub use media_sniffer::{MediaKind, TargetMedia, sniff_media_kind};
pub use path_validator::{ensure_directory_exists, validate_file_exists};
pub use workspace::{
    CONCAT_MANIFEST_NAME, FRAME_RANGE_RECORD_NAME, OUT_DIRECTORY_NAME, TEMP_DIRECTORY_NAME,
    TEMP_OUTPUT_VIDEO_NAME, Workspace, default_temp_root, workspace_key,
};
