/// 클라이언트 오류 정의
/// 1. 전송 오류 (네트워크, 비정상 응답)
/// 2. 입력 검증 오류 (입찰 금액)
/// 3. 서버 비즈니스 오류 (구조화된 에러 코드)
// region:    --- Imports
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Error Code
/// 서버가 내려주는 구조화된 에러 코드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    LowBid,
    NotStarted,
    AlreadyEnded,
    InvalidStatus,
    AuctionNotApproved,
    SelfBid,
    InvalidFileType,
    FileTooLarge,
    PaymentFailed,
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    /// 코드가 없는 구버전 응답을 위한 메시지 기반 추정
    pub fn from_legacy_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("invalid file type") {
            ErrorCode::InvalidFileType
        } else if lower.contains("file too large") {
            ErrorCode::FileTooLarge
        } else if lower.contains("higher than") || lower.contains("too low") {
            ErrorCode::LowBid
        } else if lower.contains("has ended") || lower.contains("already ended") {
            ErrorCode::AlreadyEnded
        } else {
            ErrorCode::Unknown
        }
    }
}

/// 서버 에러 응답 바디
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default, alias = "message")]
    pub error: String,
    #[serde(default)]
    pub code: Option<ErrorCode>,
}

impl ErrorBody {
    pub fn resolved_code(&self) -> ErrorCode {
        self.code
            .unwrap_or_else(|| ErrorCode::from_legacy_message(&self.error))
    }
}
// endregion: --- Error Code

// region:    --- Validation
/// 입찰 입력 검증 오류 (네트워크 호출 전에 발생)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidValidationError {
    #[error("bid amount is empty")]
    Empty,
    #[error("bid amount is not a number: {0}")]
    Malformed(String),
    #[error("bid amount must be positive")]
    NotPositive,
    #[error("bid must be higher than {minimum}")]
    TooLow { minimum: Decimal },
}
// endregion: --- Validation

// region:    --- Client Error
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status {
        status: u16,
        code: ErrorCode,
        message: String,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] BidValidationError),

    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("view has been shut down")]
    Closed,
}

impl ClientError {
    /// 사용자에게 보여줄 메시지 (에러 코드 기준으로 선택)
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            ClientError::Status { code, message, .. } => match code {
                ErrorCode::LowBid => "Your bid must be higher than the current bid.".to_string(),
                ErrorCode::NotStarted => "This auction has not started yet.".to_string(),
                ErrorCode::AlreadyEnded => "This auction has already ended.".to_string(),
                ErrorCode::InvalidStatus => "This auction is not accepting bids.".to_string(),
                ErrorCode::AuctionNotApproved => {
                    "This auction is still awaiting approval.".to_string()
                }
                ErrorCode::SelfBid => "You cannot bid on your own auction.".to_string(),
                ErrorCode::InvalidFileType => {
                    "Invalid file type. Please upload a JPG, PNG or WEBP image.".to_string()
                }
                ErrorCode::FileTooLarge => "File too large. Maximum size is 5MB.".to_string(),
                ErrorCode::PaymentFailed => "Payment failed. Please try again.".to_string(),
                ErrorCode::Unknown if !message.is_empty() => message.clone(),
                ErrorCode::Unknown => "Something went wrong. Please try again.".to_string(),
            },
            ClientError::Unauthorized => "Please log in to continue.".to_string(),
            ClientError::NotFound(what) => format!("{} Not Found", what),
            ClientError::Validation(e) => match e {
                BidValidationError::Empty => "Please enter a bid amount.".to_string(),
                BidValidationError::Malformed(_) => "Please enter a valid amount.".to_string(),
                BidValidationError::NotPositive => "Bid amount must be positive.".to_string(),
                BidValidationError::TooLow { minimum } => {
                    format!("Bid must be higher than ${}", minimum)
                }
            },
            ClientError::Decode(_) | ClientError::Config(_) | ClientError::Storage(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            ClientError::Closed => "This view is no longer active.".to_string(),
        }
    }

    /// 입력 검증 오류 여부 (필드 단위 표시 대상)
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
// endregion: --- Client Error

// endregion: --- Tests
