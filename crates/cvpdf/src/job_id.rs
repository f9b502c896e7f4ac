/// Generates a fresh job identifier.
///
/// The UI process calls this when it initiates a conversion; the ID is then
/// carried on every checkpoint and event for that job.
pub fn new_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
