use crate::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

pub const SERVICE_KEY_ENV: &str = "API_KEY_KAMCO_Decoding";

pub const BASE_API_URL: &str =
    "http://openapi.onbid.co.kr/openapi/services/UtlinsttPblsalThingInquireSvc";
pub const PUBLIC_SALE_OPERATION: &str = "getPublicSaleObject";
pub const RESULT_CODE_SUCCESS: &str = "00";
pub const WINDOW_DAYS: i64 = 7;

pub const DEFAULT_BASE_DIR: &str = ".";
pub const DEFAULT_DISPOSAL_METHOD: &str = "0001";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const MAX_WORKERS: usize = 4;
pub const BACKUP_EVERY_CHUNKS: usize = 5;

pub const HTTP_TIMEOUT_SECONDS: u64 = 60;
pub const HTTP_CONNECT_TIMEOUT: u64 = 20;
pub const MAX_ATTEMPTS: u32 = 3;
pub const REQUEST_PACE_SECS: u64 = 2;
pub const RETRY_BACKOFF_SECS: u64 = 5;

pub const BACKUP_DIR: &str = "backup";
pub const DATA_DIR: &str = "data";
pub const FILE_PREFIX: &str = "kamco_auction";
pub const CHUNK_PREFIX: &str = "kamco_auction_chunk_";
pub const XLSX_EXT: &str = "xlsx";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const SHEET_NAME: &str = "공매물건목록";
pub const MAX_COLUMN_WIDTH: usize = 255;
pub const MAX_URLS_PER_SHEET: usize = 65_530;
pub const MAX_CELL_CHARS: usize = 32_767;

pub const SEQUENCE_FIELD: &str = "순번";
pub const LINK_TARGET_FIELD: &str = "물건관리번호";
pub const DETAIL_PAGE_URL: &str =
    "https://www.onbid.co.kr/op/cta/cltrdtl/collateralDetailMoveableAssetsDetail.do";

/// Query parameter name and the record field feeding it, in URL order.
pub const LINK_FIELDS: [(&str, &str); 6] = [
    ("cltrHstrNo", "물건이력번호"),
    ("cltrNo", "물건번호"),
    ("plnmNo", "공고번호"),
    ("pbctNo", "공매번호"),
    ("scrnGrpCd", "화면그룹코드"),
    ("pbctCdtnNo", "공매조건번호"),
];

/// API element name to output column name.
pub const FIELD_MAPPING: [(&str, &str); 38] = [
    ("RNUM", "순번"),
    ("PLNM_NO", "공고번호"),
    ("PBCT_NO", "공매번호"),
    ("PBCT_CDTN_NO", "공매조건번호"),
    ("CLTR_NO", "물건번호"),
    ("CLTR_HSTR_NO", "물건이력번호"),
    ("SCRN_GRP_CD", "화면그룹코드"),
    ("CTGR_FULL_NM", "용도명"),
    ("BID_MNMT_NO", "입찰번호"),
    ("CLTR_NM", "물건명"),
    ("CLTR_MNMT_NO", "물건관리번호"),
    ("LDNM_ADRS", "물건소재지(지번)"),
    ("NMRD_ADRS", "물건소재지(도로명)"),
    ("LDNM_PNU", "지번PNU"),
    ("DPSL_MTD_CD", "처분방식코드"),
    ("DPSL_MTD_NM", "처분방식코드명"),
    ("BID_MTD_NM", "입찰방식명"),
    ("MIN_BID_PRC", "최저입찰가"),
    ("APSL_ASES_AVG_AMT", "감정가"),
    ("FEE_RATE", "최저입찰가율"),
    ("PBCT_BEGN_DTM", "입찰시작일시"),
    ("PBCT_CLS_DTM", "입찰마감일시"),
    ("PBCT_CLTR_STAT_NM", "물건상태"),
    ("USCBD_CNT", "유찰횟수"),
    ("IQRY_CNT", "조회수"),
    ("GOODS_NM", "물건상세정보"),
    ("MANF", "제조사"),
    ("MDL", "모델"),
    ("NRGT", "연월식"),
    ("GRBX", "변속기"),
    ("ENDPC", "배기량"),
    ("VHCL_MLGE", "주행거리"),
    ("FUEL", "연료"),
    ("SCRT_NM", "법인명"),
    ("TPBZ", "업종"),
    ("ITM_NM", "종목명"),
    ("MMB_RGT_NM", "회원권명"),
    ("CLTR_IMG_FILE", "물건 이미지"),
];

pub const COLUMN_ORDER: [&str; 38] = [
    "순번",
    "물건관리번호",
    "용도명",
    "물건명",
    "물건소재지(지번)",
    "지번PNU",
    "물건소재지(도로명)",
    "입찰방식명",
    "감정가",
    "최저입찰가",
    "최저입찰가율",
    "입찰시작일시",
    "입찰마감일시",
    "물건상태",
    "유찰횟수",
    "조회수",
    "물건상세정보",
    "공고번호",
    "공매번호",
    "공매조건번호",
    "물건번호",
    "물건이력번호",
    "화면그룹코드",
    "입찰번호",
    "처분방식코드",
    "처분방식코드명",
    "제조사",
    "모델",
    "연월식",
    "변속기",
    "배기량",
    "주행거리",
    "연료",
    "법인명",
    "업종",
    "종목명",
    "회원권명",
    "물건 이미지",
];

pub static CHUNK_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^kamco_auction_chunk_(\d+)_of_(\d+)_\d{8}_\d{6}\.xlsx$").unwrap()
});

/// Pacing and retry timing for one page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Slept before every attempt.
    pub pace: Duration,
    /// Slept after a failed attempt that will be retried.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            pace: Duration::from_secs(REQUEST_PACE_SECS),
            backoff: Duration::from_secs(RETRY_BACKOFF_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            pace: Duration::ZERO,
            backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub base_dir: PathBuf,
    pub disposal_method: String,
    pub items_per_page: u32,
    pub chunk_size: usize,
    pub workers: usize,
    pub retry: RetryPolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            disposal_method: DEFAULT_DISPOSAL_METHOD.to_string(),
            items_per_page: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: default_workers(),
            retry: RetryPolicy::default(),
        }
    }
}

impl CollectorConfig {
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join(BACKUP_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.backup_dir().join(DATA_DIR)
    }

    pub fn backup_interval(&self) -> usize {
        self.chunk_size * BACKUP_EVERY_CHUNKS
    }

    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.items_per_page == 0 {
            return Err(AppError::Argument("page size must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(AppError::Argument("chunk size must be at least 1".into()));
        }
        if self.disposal_method.trim().is_empty() {
            return Err(AppError::Argument(
                "disposal method code must not be empty".into(),
            ));
        }
        Ok(())
    }
}

pub fn default_workers() -> usize {
    num_cpus::get().min(MAX_WORKERS).max(1)
}

/// Reads the API credential, loading `.env` first when one exists.
pub fn load_service_key() -> AppResult<String> {
    let _ = dotenvy::dotenv();
    match std::env::var(SERVICE_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(AppError::Config(format!(
            "{} is not set. Add it to the environment or a .env file.",
            SERVICE_KEY_ENV
        ))),
    }
}
