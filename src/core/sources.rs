// ---------------------------------------------------------------------------
// Seed-source catalog. Official press-release feeds get a stronger priority
// than general news fronts.
// ---------------------------------------------------------------------------

pub const NEWS_PRIORITY: i64 = -10;
pub const OFFICIAL_PRIORITY: i64 = -15;

/// One crawl entry point.
#[derive(Debug, Clone)]
pub struct NewsSource {
    pub name: &'static str,
    pub base_url: &'static str,
    pub path: &'static str,
    pub priority: i64,
}

impl NewsSource {
    pub const fn new(name: &'static str, base_url: &'static str, path: &'static str) -> Self {
        Self {
            name,
            base_url,
            path,
            priority: NEWS_PRIORITY,
        }
    }

    pub const fn official(
        name: &'static str,
        base_url: &'static str,
        path: &'static str,
    ) -> Self {
        Self {
            name,
            base_url,
            path,
            priority: OFFICIAL_PRIORITY,
        }
    }

    pub fn seed_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

pub fn default_news_sources() -> Vec<NewsSource> {
    vec![
        NewsSource::new("Moneycontrol", "https://www.moneycontrol.com/", "/"),
        NewsSource::new("Economic Times", "https://economictimes.indiatimes.com/", "/"),
        NewsSource::new("Business Standard", "https://www.business-standard.com/", "/"),
        NewsSource::new("Mint (LiveMint)", "https://www.livemint.com/", "/"),
        NewsSource::new("CNBC-TV18", "https://www.cnbctv18.com/", "/"),
        NewsSource::new("NDTV Profit", "https://www.ndtvprofit.com/", "/"),
        NewsSource::official(
            "PIB (Press Information Bureau)",
            "https://pib.gov.in/",
            "/AllRelease.aspx",
        ),
        NewsSource::official(
            "Ministry of Finance",
            "https://finmin.gov.in/",
            "/press-releases",
        ),
        NewsSource::official(
            "SEBI (Securities & Exchange Board)",
            "https://www.sebi.gov.in/",
            "/sebiweb/home/HomeAction.do?doListing=yes&sid=1&ssid=7&smid=0",
        ),
        NewsSource::official(
            "RBI (Reserve Bank of India)",
            "https://www.rbi.org.in/",
            "/Scripts/BS_PressReleaseDisplay.aspx",
        ),
        NewsSource::official(
            "GST Council",
            "https://gstcouncil.gov.in/",
            "/press-release",
        ),
    ]
}
