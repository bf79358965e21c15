mod query_test;
