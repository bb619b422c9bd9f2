use std::sync::Arc;

use taskdash_db::Database;
use taskdash_export::Exporter;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<Database>,
    pub s3_exporter: Exporter,
    pub drive_exporter: Exporter,
}
