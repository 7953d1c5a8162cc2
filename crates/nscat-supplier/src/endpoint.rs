/// Dataset endpoints of the supplier API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Catalog,
    Stock,
    UnitsOfMeasure,
    Prices,
    WholesaleCsv,
}

impl Endpoint {
    /// Path relative to the API base URL.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Catalog => "producto/getCatalogo",
            Endpoint::Stock => "producto/getStock",
            Endpoint::UnitsOfMeasure => "producto/getUnidadMedida",
            Endpoint::Prices => "producto/getPrecio",
            Endpoint::WholesaleCsv => "producto/getCsv",
        }
    }

    /// Short upstream operation name used in logs and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Catalog => "getCatalogo",
            Endpoint::Stock => "getStock",
            Endpoint::UnitsOfMeasure => "getUnidadMedida",
            Endpoint::Prices => "getPrecio",
            Endpoint::WholesaleCsv => "getCsv",
        }
    }

    /// Wrapper keys specific to this dataset, tried after the generic ones.
    #[must_use]
    pub fn envelope_keys(self) -> &'static [&'static str] {
        match self {
            Endpoint::Catalog => &["catalogo", "productos", "products"],
            Endpoint::Stock => &["stock", "stocks"],
            Endpoint::UnitsOfMeasure => &["unidades", "unidadesMedida", "uoms"],
            Endpoint::Prices => &["precios", "prices"],
            Endpoint::WholesaleCsv => &[],
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
