use crate::serializer::Ident;

use docsql_core::schema::Field;

/// `"name" TYPE [PRIMARY KEY | NOT NULL] [DEFAULT ..]`
pub(super) fn column_def(field: &Field) -> String {
    let mut def = format!("{} {}", Ident(&field.name), field.ty.sql_name());

    if field.name == "_id" {
        def.push_str(" PRIMARY KEY");
    } else if !field.nullable {
        def.push_str(" NOT NULL");
    }

    if let Some(default) = field.default_value_sql() {
        def.push_str(" DEFAULT ");
        def.push_str(&default);
    }

    def
}
