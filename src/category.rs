use serde::Serialize;

/// Upload menu. Each variant owns exactly one destination table; the table
/// names below are the only identifiers ever used for destructive statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    MasterProduk,
    UploadPesanan,
    InStok,
    Pengembalian,
    PesananDiterima,
    ReturDiterima,
    SoUlang,
    GagalKirim,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::MasterProduk,
        Category::UploadPesanan,
        Category::InStok,
        Category::Pengembalian,
        Category::PesananDiterima,
        Category::ReturDiterima,
        Category::SoUlang,
        Category::GagalKirim,
    ];

    /// URL path segment (without the leading slash).
    pub fn slug(self) -> &'static str {
        match self {
            Category::MasterProduk => "masterproduk",
            Category::UploadPesanan => "uploadpesanan",
            Category::InStok => "instok",
            Category::Pengembalian => "pengembalian",
            Category::PesananDiterima => "pesananditerima",
            Category::ReturDiterima => "returditerima",
            Category::SoUlang => "soulang",
            Category::GagalKirim => "gagalkirim",
        }
    }

    pub fn table_name(self) -> &'static str {
        match self {
            Category::MasterProduk => "master_produk",
            Category::UploadPesanan => "upload_pesanan",
            Category::InStok => "in_stok",
            Category::Pengembalian => "pengembalian",
            Category::PesananDiterima => "pesanan_diterima",
            Category::ReturDiterima => "retur_diterima",
            Category::SoUlang => "so_ulang",
            Category::GagalKirim => "gagal_kirim",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::MasterProduk => "Master Produk",
            Category::UploadPesanan => "Upload Pesanan",
            Category::InStok => "In Stok",
            Category::Pengembalian => "Pengembalian",
            Category::PesananDiterima => "Pesanan Diterima",
            Category::ReturDiterima => "Retur Diterima",
            Category::SoUlang => "SO Ulang",
            Category::GagalKirim => "Gagal Kirim",
        }
    }

    /// Path used after a clear/redirect for this category.
    pub fn path(self) -> String {
        format!("/{}", self.slug())
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }

    /// Allow-list lookup. Anything not in the fixed table set yields `None`.
    pub fn from_table_name(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.table_name() == table)
    }
}
