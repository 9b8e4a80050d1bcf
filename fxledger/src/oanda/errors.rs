#[derive(Debug)]
pub struct ApiStatusError {
    pub status: u16,
    pub message: String,
}

impl std::fmt::Display for ApiStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ApiStatusError: {} {}", self.status, self.message)
    }
}

impl std::error::Error for ApiStatusError {}
