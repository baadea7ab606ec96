//! Fixed values shared across legend parsing, inference and table assembly
//!
//! This module contains the literal markers, window offsets and artifact
//! names the map-processing pipeline has always used, so the CSV files it
//! writes stay readable by existing consumers.

/// Legend text conventions
pub mod legend {
    /// Unit marker written when a legend label carries no unit suffix
    pub const UNSPECIFIED_UNIT: &str = "u";

    /// Placeholder labels that never produce a value
    pub const PLACEHOLDER_TOKENS: [&str; 2] = ["N/A", "-"];

    /// Separator between the lower and upper bound of a range label
    pub const RANGE_SEPARATOR: char = '-';

    /// Thousands separator stripped before parsing
    pub const THOUSANDS_SEPARATOR: char = ',';
}

/// Acceptance window offsets for continuous ramps
pub mod ramp {
    /// Offset applied to the first pair of a ramp
    pub const FIRST_PAIR_DELTA: f64 = 1.0;

    /// Offset applied to the last pair of a ramp
    pub const LAST_PAIR_DELTA: f64 = -0.5;

    /// Offset applied to interior pairs
    pub const INTERIOR_PAIR_DELTA: f64 = 0.0;
}

/// Result table conventions
pub mod table {
    /// Header of the region column
    pub const REGION_COLUMN: &str = "State_Name";

    /// Label of the trailing provenance row
    pub const PROVENANCE_LABEL: &str = "File_Name";

    /// Value used for cells with no observation
    pub const MISSING_SENTINEL: f64 = 0.0;
}

/// Artifact file names written by a batch run
pub mod artifacts {
    pub const CLASSIFICATION: &str = "classification.csv";
    pub const OBJECTS: &str = "output_objects.csv";
    pub const STATE_SEGMENTATION: &str = "output_objects_state_segmentation.csv";
    pub const OCR_OUTPUT: &str = "OCR_output.csv";
    pub const COLOR_TO_DATA: &str = "Color_To_Data_Mapping.csv";
}

/// Labels of the progress steps reported during a batch run
pub const PROGRESS_STEPS: [&str; 6] = [
    "Uploading Images to Server",
    "Classification of Map Legend Type",
    "Segmentation of Map Components",
    "Segmentation of State Boundaries",
    "Text Data Extraction using OCR",
    "State Color to Legend Data Mapping",
];

/// Region classes known to the state segmentation model, in class-index order
pub const STATE_NAMES: [&str; 50] = [
    "Washington", "Idaho", "Montana", "North Dakota", "South Dakota", "Minnesota", "Iowa",
    "Wisconsin", "Illinois", "Indiana", "Michigan", "Ohio", "Pennsylvania", "New York",
    "Vermont", "New Hampshire", "Maine", "Massachusetts", "Rhode Island", "Connecticut",
    "New Jersey", "Delaware", "Maryland", "West Virginia", "Virginia", "Kentucky", "Tennessee",
    "North Carolina", "South Carolina", "Georgia", "Alabama", "Mississippi", "Florida",
    "Louisiana", "Arkansas", "Oklahoma", "Texas", "New Mexico", "Colorado", "Wyoming",
    "Nebraska", "Utah", "Arizona", "Nevada", "California", "Oregon", "Alaska", "Hawaii",
    "Kansas", "Missouri",
];

/// Check whether a region name belongs to the known universe
pub fn is_known_region(name: &str) -> bool {
    STATE_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names_unique() {
        let mut names: Vec<&str> = STATE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 50);
    }

    #[test]
    fn test_known_region() {
        assert!(is_known_region("Texas"));
        assert!(is_known_region("New Hampshire"));
        assert!(!is_known_region("Puerto Rico"));
        assert!(!is_known_region("texas"));
    }

    #[test]
    fn test_ramp_window_offsets() {
        assert!(ramp::LAST_PAIR_DELTA < ramp::INTERIOR_PAIR_DELTA);
        assert!(ramp::INTERIOR_PAIR_DELTA < ramp::FIRST_PAIR_DELTA);
    }
}
