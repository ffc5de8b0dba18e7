//! Constants used throughout the batch driver.
//!
//! File locations default to the working directory layout the driver has always
//! used, and the result table widths match the published SubCell models.

/// The default channel set, in red, yellow, blue, green order.
pub const DEFAULT_MODEL_CHANNELS: &str = "rybg";

/// The default model variant.
pub const DEFAULT_MODEL_TYPE: &str = "mae_contrast_supcon_model";

/// The default run configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// The default YAML manifest of model download URLs.
pub const DEFAULT_URLS_MANIFEST: &str = "models_urls.yaml";

/// The default root directory for model artifacts.
pub const DEFAULT_MODELS_DIR: &str = "models";

/// The default image-set manifest.
pub const DEFAULT_PATH_LIST: &str = "path_list.csv";

/// The default result table written in CSV mode.
pub const DEFAULT_RESULT_CSV: &str = "result.csv";

/// The log file, truncated on every run.
pub const LOG_FILE: &str = "log.txt";

/// File name of the encoder weights inside a model directory.
pub const ENCODER_FILE: &str = "encoder.pth";

/// File name of the classifier weights inside a model directory.
pub const CLASSIFIER_FILE: &str = "classifier.pth";

/// File name of the model configuration inside a model directory.
pub const MODEL_CONFIG_FILE: &str = "model_config.yaml";

/// Number of localization classes predicted by the classifier.
pub const NUM_CLASSES: usize = 31;

/// Length of the pooled embedding produced by the encoder.
pub const EMBEDDING_DIM: usize = 1536;

/// Number of ranked classes reported per image.
pub const TOP_K: usize = 3;

/// Human-readable names of the localization classes, indexed by class id.
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "Actin filaments",
    "Aggresome",
    "Cell Junctions",
    "Centriolar satellite",
    "Centrosome",
    "Cytokinetic bridge",
    "Cytoplasmic bodies",
    "Cytosol",
    "Endoplasmic reticulum",
    "Endosomes",
    "Focal adhesion sites",
    "Golgi apparatus",
    "Intermediate filaments",
    "Lipid droplets",
    "Lysosomes",
    "Microtubules",
    "Midbody",
    "Mitochondria",
    "Mitotic chromosome",
    "Mitotic spindle",
    "Nuclear bodies",
    "Nuclear membrane",
    "Nuclear speckles",
    "Nucleoli",
    "Nucleoli fibrillar center",
    "Nucleoli rim",
    "Nucleoplasm",
    "Peroxisomes",
    "Plasma membrane",
    "Primary cilium",
    "Vesicles",
];
