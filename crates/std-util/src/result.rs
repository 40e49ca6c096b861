/// Asserts that the expression is `Err` and returns the error.
#[macro_export]
macro_rules! assert_err {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Err(e) => e,
            actual => {
                use std::fmt::Write;
                let mut msg = format!("expected `Err`; actual={:?}", actual);

                $(
                    write!(msg, ", ").unwrap();
                    write!(msg, $($t)*).unwrap();
                )?

                panic!("{}", msg);
            }
        }
    };
}

/// Asserts that the expression is `Err` and its message contains `needle`.
#[macro_export]
macro_rules! assert_err_contains {
    ($e:expr, $needle:expr) => {{
        let err = $crate::assert_err!($e);
        let message = err.to_string();
        assert!(
            message.contains($needle),
            "expected error containing {:?}; actual={:?}",
            $needle,
            message
        );
        err
    }};
}

/// Asserts that the expression is `Ok` and returns the value.
#[macro_export]
macro_rules! assert_ok {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            actual => panic!("expected `Ok`; actual={:?}", actual),
        }
    };
}
