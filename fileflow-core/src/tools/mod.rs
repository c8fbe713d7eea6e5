pub mod notify;
pub mod report;
pub mod shell;
pub mod types;

pub use notify::TracingNotificationSink;
pub use report::JsonFileReportSink;
pub use shell::ShellScriptRunner;
pub use types::{
    Notification, NotificationSink, Report, ReportSink, ScriptInvocation, ScriptOutput,
    ScriptRunner,
};
