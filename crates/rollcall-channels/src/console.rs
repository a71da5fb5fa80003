//! Console notifier: writes the report to stdout.

use async_trait::async_trait;
use rollcall_core::{error::CheckinError, traits::Notifier};

pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(&self, title: &str, body: &str) -> Result<(), CheckinError> {
        println!("{title}\n\n{body}");
        Ok(())
    }
}
