mod sentinel_cluster_test;
