use facet::Facet;

/// Column a view can be ordered by.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum SortField {
    DownloadSpeed,
    UploadSpeed,
    ConnectTime,
    /// Cumulative downloaded bytes.
    Download,
    /// Cumulative uploaded bytes.
    Upload,
}

impl SortField {
    /// Maps a table column id to a field. Unknown ids yield `None`.
    pub fn from_column_id(id: &str) -> Option<Self> {
        match id {
            "dlSpeed" | "downloadSpeed" | "download_speed" => Some(Self::DownloadSpeed),
            "ulSpeed" | "uploadSpeed" | "upload_speed" => Some(Self::UploadSpeed),
            "connectTime" | "start" => Some(Self::ConnectTime),
            "dl" | "download" => Some(Self::Download),
            "ul" | "upload" => Some(Self::Upload),
            _ => None,
        }
    }
}

#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub descending: bool,
}

/// One entry of the stored sorting preference, `[{ "id": "dl", "desc": true }]`.
#[derive(Facet, Clone, Debug, PartialEq, Eq)]
pub struct SortingEntry {
    pub id: String,
    #[facet(default)]
    pub desc: bool,
}

impl SortingEntry {
    pub fn to_spec(&self) -> Option<SortSpec> {
        SortField::from_column_id(&self.id).map(|field| SortSpec {
            field,
            descending: self.desc,
        })
    }
}

/// Parses the stored sorting preference document.
///
/// Only the first entry is honored. Anything unparsable or naming an unknown
/// column means "no sort".
pub fn parse_sorting_preference(text: &str) -> Option<SortSpec> {
    let entries: Vec<SortingEntry> = facet_json::from_str(text).ok()?;
    entries.first().and_then(SortingEntry::to_spec)
}
