use super::device_code::DeviceCodeGrant;

/// Presents the verification URL and user code to the user.
pub trait DevicePrompt: Send + Sync {
    fn show(&self, grant: &DeviceCodeGrant);
}

impl<F> DevicePrompt for F
where
    F: Fn(&DeviceCodeGrant) + Send + Sync,
{
    fn show(&self, grant: &DeviceCodeGrant) {
        self(grant)
    }
}

/// Prints the activation instructions to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrPrompt;

impl DevicePrompt for StderrPrompt {
    fn show(&self, grant: &DeviceCodeGrant) {
        eprintln!(
            "Go to {} and enter code {}, waiting until you do...",
            grant.verification_url, grant.user_code
        );
    }
}
