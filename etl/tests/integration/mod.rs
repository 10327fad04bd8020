mod mysql_pipeline_test;
