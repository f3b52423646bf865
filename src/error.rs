use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeyCodecError>;

#[derive(Debug, Error)]
pub enum KeyCodecError {
    #[error("Неверные входные данные: {0}")]
    InvalidInput(String),

    #[error("Неподдерживаемый алгоритм: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Неподдерживаемая комбинация параметров: {0}")]
    UnsupportedCombination(String),

    #[error("Повреждённый контейнер OpenSSH: {0}")]
    MalformedContainer(String),

    #[error("Ключ зашифрован. Укажите парольную фразу.")]
    PassphraseRequired,

    #[error("Ошибка расшифровки: неверная парольная фраза или повреждённые данные")]
    DecryptionFailed,

    #[error("Ошибка вычисления ключа (KDF): {0}")]
    KdfFailure(String),

    #[error("Ошибка шифрования: {0}")]
    CipherFailure(String),

    #[error("Ошибка источника случайных чисел: {0}")]
    RandomSourceFailure(String),

    #[error("Ошибка кодирования: {0}")]
    EncodingFailure(String),

    #[error("Не удалось выделить память: {0}")]
    AllocationFailure(String),

    #[error("Недостаточный размер буфера: требуется {needed} байт, доступно {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Discriminant of [`KeyCodecError`] without the message, for callers that
/// only need to decide whether to re-prompt or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedAlgorithm,
    UnsupportedCombination,
    MalformedContainer,
    PassphraseRequired,
    DecryptionFailed,
    KdfFailure,
    CipherFailure,
    RandomSourceFailure,
    EncodingFailure,
    AllocationFailure,
    BufferTooSmall,
    Io,
    Json,
}

impl KeyCodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Self::UnsupportedCombination(_) => ErrorKind::UnsupportedCombination,
            Self::MalformedContainer(_) => ErrorKind::MalformedContainer,
            Self::PassphraseRequired => ErrorKind::PassphraseRequired,
            Self::DecryptionFailed => ErrorKind::DecryptionFailed,
            Self::KdfFailure(_) => ErrorKind::KdfFailure,
            Self::CipherFailure(_) => ErrorKind::CipherFailure,
            Self::RandomSourceFailure(_) => ErrorKind::RandomSourceFailure,
            Self::EncodingFailure(_) => ErrorKind::EncodingFailure,
            Self::AllocationFailure(_) => ErrorKind::AllocationFailure,
            Self::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
        }
    }

    /// Whether asking the user for a (different) passphrase may resolve the error.
    pub fn is_passphrase_problem(&self) -> bool {
        matches!(self, Self::PassphraseRequired | Self::DecryptionFailed)
    }
}
