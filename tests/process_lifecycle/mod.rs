mod standalone_test;
