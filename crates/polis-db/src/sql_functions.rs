diesel::define_sql_function! {
    /// Lower-cases text inside the database, for case-insensitive comparisons.
    fn lower(value: diesel::sql_types::Text) -> diesel::sql_types::Text;
}
