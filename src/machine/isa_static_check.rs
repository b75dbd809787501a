#[cfg(test)]
mod tests {
    const EXPECTED_TABLE: &str =
        "Inc=inc[register:Register,go_to_step:Step];\
         Deb=deb[register:Register,go_to_step:Step,branch_to_step:Step];\
         End=end[];";

    macro_rules! describe_table {
        (
            $( $(#[$doc:meta])* $name:ident = $keyword:literal => [ $( $field:ident : $kind:ident ),* $(,)? ] ),* $(,)?
        ) => {{
            let mut table = String::new();
            $(
                table.push_str(stringify!($name));
                table.push('=');
                table.push_str($keyword);
                table.push('[');
                let fields: &[&str] = &[ $( concat!(stringify!($field), ":", stringify!($kind)) ),* ];
                table.push_str(&fields.join(","));
                table.push_str("];");
            )*
            table
        }};
    }

    macro_rules! step_fields {
        (
            $( $(#[$doc:meta])* $name:ident = $keyword:literal => [ $( $field:ident : $kind:ident ),* $(,)? ] ),* $(,)?
        ) => {{
            let mut fields: Vec<(&str, &str)> = Vec::new();
            $( $( fields.push((stringify!($field), stringify!($kind))); )* )*
            fields
        }};
    }

    #[test]
    fn table_unchanged() {
        assert_eq!(crate::for_each_operation!(describe_table), EXPECTED_TABLE);
    }

    #[test]
    fn step_operands_are_named_as_targets() {
        for (field, kind) in crate::for_each_operation!(step_fields) {
            assert_eq!(kind == "Step", field.ends_with("_step"), "{field}: {kind}");
        }
    }
}
