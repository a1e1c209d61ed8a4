//! Default instruction pair for the parts-identification task.

/// The system instruction sent with every submission.
pub const PARTS_ANALYSIS_SYSTEM_PROMPT: &str =
    "You are an expert on spare parts for construction machinery. Answer strictly.";

/// The user instruction. The surface syntax it requests (a JSON object with
/// the canonical field names) is what extraction level 1 and 3 expect.
pub const PARTS_ANALYSIS_USER_PROMPT: &str = "Return a JSON object with the fields: \
catalog_number, description, manufacturer, analogs, machine_type, machine_model. \
If a field cannot be determined, set its value to 'UNKNOWN'.";
