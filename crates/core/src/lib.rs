mod apply;
mod config;
mod discovery;
mod exif_reader;
mod media;
mod metadata;
mod naming;
mod planner;
mod resolver;
mod run;
mod video_probe;

#[cfg(test)]
mod test_support;

pub use apply::{apply_plan, ApplyResult, RenameOutcome};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
};
pub use discovery::{directories_with_media, discover, MediaTree, UnreadableEntry};
pub use exif_reader::{parse_exif_datetime, read_dng_date, read_heic_date, read_image_date};
pub use media::{is_media_file, MediaFile, MediaFormat};
pub use metadata::{DateSource, ExtractWarning, Extraction, ResolvedDate};
pub use naming::{sequence_in_name, target_file_name};
pub use planner::{
    generate_plan, plan_files, CollisionPolicy, PlanOptions, PlannedAction, RenameCandidate,
    RenamePlan, RenameStats,
};
pub use resolver::{DateResolver, FileTimes};
pub use run::{rename_media, BatchReport, DirectoryError, RunOptions, RunReport};
pub use video_probe::{
    parse_video_datetime, read_video_date, FfprobeProbe, MetadataProbe, ProbeDocument,
    ProbeError, ProbeSection, DEFAULT_PROBE_TIMEOUT,
};
