use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub provider_url: String,
    pub provider_key: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(provider_url: String) -> Self {
        Self {
            provider_url,
            provider_key: SecretString::default(),
        }
    }

    pub fn set_provider_key(&mut self, key: SecretString) {
        self.provider_key = key;
    }
}
